use std::sync::Arc;

use crate::stores::audit_store::{AuditStore, NewAuditEntry};
use crate::types::internal::scope::Principal;

/// Best-effort audit trail writer.
///
/// Writes happen after the primary operation has already succeeded and are
/// spawned onto the runtime; a failed write is logged and discarded, never
/// surfaced to the caller.
pub struct AuditLogger {
    store: Arc<AuditStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<AuditStore>) -> Self {
        Self { store }
    }

    /// Fire-and-forget append attributed to an authenticated principal
    pub fn log(
        &self,
        principal: &Principal,
        action: &str,
        entity_type: &str,
        details: impl Into<String>,
    ) {
        self.log_actor(&principal.id, &principal.name, action, entity_type, details);
    }

    /// Fire-and-forget append with explicit actor fields (used by login and
    /// registration, where no principal exists yet)
    pub fn log_actor(
        &self,
        actor_id: &str,
        actor_name: &str,
        action: &str,
        entity_type: &str,
        details: impl Into<String>,
    ) {
        let store = Arc::clone(&self.store);
        let entry = NewAuditEntry {
            actor_id: actor_id.to_string(),
            actor_name: actor_name.to_string(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            details: details.into(),
        };
        tokio::spawn(async move {
            Self::write(&store, entry).await;
        });
    }

    /// Append synchronously, swallowing any failure
    pub async fn write(store: &AuditStore, entry: NewAuditEntry) {
        if let Err(err) = store.record(entry).await {
            tracing::warn!(error = %err, "audit log write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_store() -> Arc<AuditStore> {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        Arc::new(AuditStore::new(db))
    }

    #[tokio::test]
    async fn write_appends_entry() {
        let store = setup_store().await;
        AuditLogger::write(
            &store,
            NewAuditEntry {
                actor_id: "u1".to_string(),
                actor_name: "Admin".to_string(),
                action: "CREATE".to_string(),
                entity_type: "Paciente".to_string(),
                details: "created patient p1".to_string(),
            },
        )
        .await;

        let rows = store.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "CREATE");
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        // No migrations: the insert will fail, but write() must not panic
        let store = AuditStore::new(db);
        AuditLogger::write(
            &store,
            NewAuditEntry {
                actor_id: "u1".to_string(),
                actor_name: "Admin".to_string(),
                action: "CREATE".to_string(),
                entity_type: "Paciente".to_string(),
                details: String::new(),
            },
        )
        .await;
    }
}
