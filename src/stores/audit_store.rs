use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::errors::ApiError;
use crate::types::db::audit_entry::{self, Entity as AuditEntry};

/// Listing reads never return more than the most recent 1000 entries
const LIST_CAP: u64 = 1000;

/// A row about to be appended to the audit log
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor_id: String,
    pub actor_name: String,
    pub action: String,
    pub entity_type: String,
    pub details: String,
}

/// Repository for the append-only audit log
///
/// The application never updates or deletes audit rows; the only writes are
/// appends through [`AuditStore::record`].
pub struct AuditStore {
    db: DatabaseConnection,
}

impl AuditStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append one entry to the log
    ///
    /// Callers that must not fail on audit problems go through
    /// `AuditLogger`, which swallows this error.
    pub async fn record(&self, entry: NewAuditEntry) -> Result<(), sea_orm::DbErr> {
        let row = audit_entry::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            timestamp: Set(Utc::now().to_rfc3339()),
            actor_id: Set(entry.actor_id),
            actor_name: Set(entry.actor_name),
            action: Set(entry.action),
            entity_type: Set(entry.entity_type),
            details: Set(entry.details),
        };
        row.insert(&self.db).await?;
        Ok(())
    }

    /// All entries, newest first, capped at 1000
    pub async fn list(&self) -> Result<Vec<audit_entry::Model>, ApiError> {
        AuditEntry::find()
            .order_by_desc(audit_entry::Column::Id)
            .limit(LIST_CAP)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_audit_entries", e))
    }

    pub async fn list_by_actor(&self, actor_id: &str) -> Result<Vec<audit_entry::Model>, ApiError> {
        AuditEntry::find()
            .filter(audit_entry::Column::ActorId.eq(actor_id))
            .order_by_desc(audit_entry::Column::Id)
            .limit(LIST_CAP)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_audit_by_actor", e))
    }

    pub async fn list_by_entity(
        &self,
        entity_type: &str,
    ) -> Result<Vec<audit_entry::Model>, ApiError> {
        AuditEntry::find()
            .filter(audit_entry::Column::EntityType.eq(entity_type))
            .order_by_desc(audit_entry::Column::Id)
            .limit(LIST_CAP)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_audit_by_entity", e))
    }

    pub async fn list_by_action(&self, action: &str) -> Result<Vec<audit_entry::Model>, ApiError> {
        AuditEntry::find()
            .filter(audit_entry::Column::Action.eq(action))
            .order_by_desc(audit_entry::Column::Id)
            .limit(LIST_CAP)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_audit_by_action", e))
    }

    /// Entries within an inclusive calendar-date range ("YYYY-MM-DD")
    ///
    /// Timestamps are RFC 3339 in UTC, so the range check is a lexicographic
    /// comparison against day boundaries.
    pub async fn list_by_range(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<audit_entry::Model>, ApiError> {
        let from_day = NaiveDate::parse_from_str(from, "%Y-%m-%d")
            .map_err(|_| ApiError::validation("Invalid 'from' date, expected YYYY-MM-DD"))?;
        let to_day = NaiveDate::parse_from_str(to, "%Y-%m-%d")
            .map_err(|_| ApiError::validation("Invalid 'to' date, expected YYYY-MM-DD"))?;
        let upper = to_day
            .succ_opt()
            .ok_or_else(|| ApiError::validation("Invalid 'to' date, expected YYYY-MM-DD"))?;

        AuditEntry::find()
            .filter(audit_entry::Column::Timestamp.gte(from_day.format("%Y-%m-%d").to_string()))
            .filter(audit_entry::Column::Timestamp.lt(upper.format("%Y-%m-%d").to_string()))
            .order_by_desc(audit_entry::Column::Id)
            .limit(LIST_CAP)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_audit_by_range", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_store() -> AuditStore {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        AuditStore::new(db)
    }

    fn entry(actor: &str, action: &str, entity: &str) -> NewAuditEntry {
        NewAuditEntry {
            actor_id: actor.to_string(),
            actor_name: format!("name-{actor}"),
            action: action.to_string(),
            entity_type: entity.to_string(),
            details: "details".to_string(),
        }
    }

    #[tokio::test]
    async fn record_and_list_returns_newest_first() {
        let store = setup_store().await;
        store.record(entry("u1", "CREATE", "Paciente")).await.unwrap();
        store.record(entry("u2", "UPDATE", "Cita")).await.unwrap();

        let rows = store.list().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].actor_id, "u2");
        assert_eq!(rows[1].actor_id, "u1");
        assert!(!rows[0].timestamp.is_empty());
    }

    #[tokio::test]
    async fn filters_by_actor_entity_and_action() {
        let store = setup_store().await;
        store.record(entry("u1", "CREATE", "Paciente")).await.unwrap();
        store.record(entry("u1", "DELETE", "Cita")).await.unwrap();
        store.record(entry("u2", "CREATE", "Cita")).await.unwrap();

        assert_eq!(store.list_by_actor("u1").await.unwrap().len(), 2);
        assert_eq!(store.list_by_entity("Cita").await.unwrap().len(), 2);
        assert_eq!(store.list_by_action("CREATE").await.unwrap().len(), 2);
        assert!(store.list_by_actor("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn range_filter_includes_today_and_rejects_bad_dates() {
        let store = setup_store().await;
        store.record(entry("u1", "LOGIN", "Usuario")).await.unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let rows = store.list_by_range(&today, &today).await.unwrap();
        assert_eq!(rows.len(), 1);

        let none = store.list_by_range("2000-01-01", "2000-01-02").await.unwrap();
        assert!(none.is_empty());

        assert!(store.list_by_range("not-a-date", &today).await.is_err());
    }
}
