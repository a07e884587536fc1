use poem_openapi::{param::Query, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{authenticate, require_admin, BearerAuth};
use crate::app_data::AppData;
use crate::errors::ApiError;
use crate::services::TokenService;
use crate::stores::{AuditStore, UserStore};
use crate::types::dto::audit::AuditListEnvelope;

/// Audit log read API (admin only)
pub struct AuditApi {
    audit_store: Arc<AuditStore>,
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
}

impl AuditApi {
    pub fn new(data: &AppData) -> Self {
        Self {
            audit_store: Arc::clone(&data.audit_store),
            users: Arc::clone(&data.users),
            tokens: Arc::clone(&data.tokens),
        }
    }
}

#[derive(Tags)]
enum AuditTags {
    /// Audit trail endpoints
    Audit,
}

#[OpenApi]
impl AuditApi {
    /// Query the audit trail, newest first, capped at 1000 entries.
    ///
    /// One filter applies per request: actor, entity, action, or the
    /// inclusive date range (`desde`+`hasta`).
    #[oai(path = "/auditoria", method = "get", tag = "AuditTags::Audit")]
    pub async fn list(
        &self,
        auth: BearerAuth,
        actor: Query<Option<String>>,
        entidad: Query<Option<String>>,
        accion: Query<Option<String>>,
        desde: Query<Option<String>>,
        hasta: Query<Option<String>>,
    ) -> Result<Json<AuditListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let entries = if let Some(actor_id) = &actor.0 {
            self.audit_store.list_by_actor(actor_id).await?
        } else if let Some(entity) = &entidad.0 {
            self.audit_store.list_by_entity(entity).await?
        } else if let Some(action) = &accion.0 {
            self.audit_store.list_by_action(action).await?
        } else if let (Some(from), Some(to)) = (&desde.0, &hasta.0) {
            self.audit_store.list_by_range(from, to).await?
        } else {
            self.audit_store.list().await?
        };

        Ok(Json(AuditListEnvelope::ok(
            "Audit entries retrieved",
            entries.into_iter().map(Into::into).collect(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::services::LogMailer;
    use crate::stores::audit_store::NewAuditEntry;
    use crate::stores::user_store::CreateUserInput;
    use crate::types::internal::scope::{Role, UserStatus};
    use migration::{Migrator, MigratorTrait};
    use poem_openapi::auth::Bearer;
    use sea_orm::Database;

    async fn setup() -> (AppData, AuditApi, BearerAuth) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        let data = AppData::new(
            db,
            Settings::for_tests(),
            Arc::new(LogMailer::new("test@clinic.local".to_string())),
        );
        let admin = data
            .users
            .seed_default_admin("admin@clinic.local", "admin123", "Administrator")
            .await
            .unwrap()
            .unwrap();
        let auth = BearerAuth(Bearer {
            token: data.tokens.issue(&admin).unwrap(),
        });
        let api = AuditApi::new(&data);
        (data, api, auth)
    }

    fn no_filters() -> (
        Query<Option<String>>,
        Query<Option<String>>,
        Query<Option<String>>,
        Query<Option<String>>,
        Query<Option<String>>,
    ) {
        (Query(None), Query(None), Query(None), Query(None), Query(None))
    }

    #[tokio::test]
    async fn admin_reads_audit_entries() {
        let (data, api, auth) = setup().await;
        data.audit_store
            .record(NewAuditEntry {
                actor_id: "u1".to_string(),
                actor_name: "Admin".to_string(),
                action: "CREATE".to_string(),
                entity_type: "Paciente".to_string(),
                details: "created".to_string(),
            })
            .await
            .unwrap();

        let (actor, entity, action, from, to) = no_filters();
        let list = api.list(auth, actor, entity, action, from, to).await.unwrap();
        assert_eq!(list.0.data.len(), 1);
        assert_eq!(list.0.data[0].action, "CREATE");
    }

    #[tokio::test]
    async fn filters_apply_one_at_a_time() {
        let (data, api, auth) = setup().await;
        for (actor, action, entity) in [
            ("u1", "CREATE", "Paciente"),
            ("u1", "DELETE", "Cita"),
            ("u2", "CREATE", "Cita"),
        ] {
            data.audit_store
                .record(NewAuditEntry {
                    actor_id: actor.to_string(),
                    actor_name: actor.to_string(),
                    action: action.to_string(),
                    entity_type: entity.to_string(),
                    details: String::new(),
                })
                .await
                .unwrap();
        }

        let list = api
            .list(
                auth,
                Query(Some("u1".to_string())),
                Query(None),
                Query(None),
                Query(None),
                Query(None),
            )
            .await
            .unwrap();
        assert_eq!(list.0.data.len(), 2);
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let (data, api, _auth) = setup().await;
        let user = data
            .users
            .create(
                CreateUserInput {
                    email: "front@clinic.local".to_string(),
                    username: None,
                    password: "secret123".to_string(),
                    name: "Front Desk".to_string(),
                    role: Role::Receptionist,
                    phone: None,
                    specialty: None,
                    license_number: None,
                    national_id: None,
                    birth_date: None,
                    gender: None,
                    address: None,
                },
                UserStatus::Active,
            )
            .await
            .unwrap();
        let auth = BearerAuth(Bearer {
            token: data.tokens.issue(&user).unwrap(),
        });

        let (actor, entity, action, from, to) = no_filters();
        let err = api
            .list(auth, actor, entity, action, from, to)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
