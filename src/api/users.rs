use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{authenticate, require_admin, BearerAuth};
use crate::app_data::AppData;
use crate::errors::ApiError;
use crate::services::{AuditLogger, TokenService};
use crate::stores::user_store::{CreateUserInput, UpdateUserInput};
use crate::stores::UserStore;
use crate::types::dto::common::MessageEnvelope;
use crate::types::dto::users::{
    CreateUserRequest, RejectUserRequest, SetUserStatusRequest, UpdateUserRequest,
    UserCreatedResponse, UserEnvelope, UserListEnvelope,
};
use crate::types::internal::scope::{Role, UserStatus};

/// User administration API (admin only)
pub struct UsersApi {
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
    audit: Arc<AuditLogger>,
}

impl UsersApi {
    pub fn new(data: &AppData) -> Self {
        Self {
            users: Arc::clone(&data.users),
            tokens: Arc::clone(&data.tokens),
            audit: Arc::clone(&data.audit),
        }
    }
}

#[derive(Tags)]
enum UserTags {
    /// User administration endpoints
    Users,
}

#[OpenApi]
impl UsersApi {
    /// List all accounts
    #[oai(path = "/usuarios", method = "get", tag = "UserTags::Users")]
    pub async fn list(&self, auth: BearerAuth) -> Result<Json<UserListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let users = self.users.list().await?;
        Ok(Json(UserListEnvelope::ok(
            "Users retrieved",
            users.into_iter().map(Into::into).collect(),
        )))
    }

    /// Fetch a single account
    #[oai(path = "/usuarios/:id", method = "get", tag = "UserTags::Users")]
    pub async fn get(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<UserEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let user = self.users.get(&id.0).await?;
        Ok(Json(UserEnvelope::ok("User retrieved", user.into())))
    }

    /// Create an account directly in active status.
    ///
    /// Patient-role accounts also create their linked patient record; both
    /// rows are written in one transaction.
    #[oai(path = "/usuarios", method = "post", tag = "UserTags::Users")]
    pub async fn create(
        &self,
        auth: BearerAuth,
        body: Json<CreateUserRequest>,
    ) -> Result<UserCreatedResponse, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let role = Role::parse(&body.role)
            .ok_or_else(|| ApiError::validation(format!("Unknown role: {}", body.role)))?;

        let created = self
            .users
            .create(
                CreateUserInput {
                    email: body.email.clone(),
                    username: body.username.clone(),
                    password: body.password.clone(),
                    name: body.name.clone(),
                    role,
                    phone: body.phone.clone(),
                    specialty: body.specialty.clone(),
                    license_number: body.license_number.clone(),
                    national_id: body.national_id.clone(),
                    birth_date: body.birth_date.clone(),
                    gender: body.gender.clone(),
                    address: body.address.clone(),
                },
                UserStatus::Active,
            )
            .await?;

        self.audit.log(
            &principal,
            "CREATE",
            "Usuario",
            format!("created {} account {}", created.role, created.email),
        );

        Ok(UserCreatedResponse::Created(Json(UserEnvelope::ok(
            "User created",
            created.into(),
        ))))
    }

    /// Update an account profile
    #[oai(path = "/usuarios/:id", method = "put", tag = "UserTags::Users")]
    pub async fn update(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        body: Json<UpdateUserRequest>,
    ) -> Result<Json<UserEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let updated = self
            .users
            .update(
                &id.0,
                UpdateUserInput {
                    email: body.email.clone(),
                    username: body.username.clone(),
                    password: body.password.clone(),
                    name: body.name.clone(),
                    phone: body.phone.clone(),
                    specialty: body.specialty.clone(),
                    license_number: body.license_number.clone(),
                },
            )
            .await?;

        self.audit.log(
            &principal,
            "UPDATE",
            "Usuario",
            format!("updated account {}", updated.id),
        );

        Ok(Json(UserEnvelope::ok("User updated", updated.into())))
    }

    /// Delete an account; the last active administrator cannot be removed
    #[oai(path = "/usuarios/:id", method = "delete", tag = "UserTags::Users")]
    pub async fn delete(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        self.users.delete(&id.0).await?;

        self.audit.log(
            &principal,
            "DELETE",
            "Usuario",
            format!("deleted account {}", id.0),
        );

        Ok(Json(MessageEnvelope::ok("User deleted")))
    }

    /// Approve a pending account
    #[oai(path = "/usuarios/:id/aprobar", method = "post", tag = "UserTags::Users")]
    pub async fn approve(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<UserEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let approved = self.users.approve(&id.0).await?;

        self.audit.log(
            &principal,
            "APPROVE",
            "Usuario",
            format!("approved account {}", approved.email),
        );

        Ok(Json(UserEnvelope::ok("User approved", approved.into())))
    }

    /// Reject a pending account with a reason
    #[oai(path = "/usuarios/:id/rechazar", method = "post", tag = "UserTags::Users")]
    pub async fn reject(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        body: Json<RejectUserRequest>,
    ) -> Result<Json<UserEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let rejected = self.users.reject(&id.0, &body.reason).await?;

        self.audit.log(
            &principal,
            "REJECT",
            "Usuario",
            format!("rejected account {}: {}", rejected.email, body.reason),
        );

        Ok(Json(UserEnvelope::ok("User rejected", rejected.into())))
    }

    /// Activate or deactivate an account
    #[oai(path = "/usuarios/:id/estado", method = "put", tag = "UserTags::Users")]
    pub async fn set_status(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        body: Json<SetUserStatusRequest>,
    ) -> Result<Json<UserEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let status = UserStatus::parse(&body.status)
            .ok_or_else(|| ApiError::validation(format!("Unknown status: {}", body.status)))?;
        let updated = self.users.set_status(&id.0, status).await?;

        self.audit.log(
            &principal,
            "UPDATE",
            "Usuario",
            format!("set account {} status to {}", updated.id, updated.status),
        );

        Ok(Json(UserEnvelope::ok("User status updated", updated.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::services::LogMailer;
    use crate::types::db::patient;
    use migration::{Migrator, MigratorTrait};
    use poem_openapi::auth::Bearer;
    use sea_orm::{Database, EntityTrait};

    async fn setup() -> (AppData, UsersApi, BearerAuth) {
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
        let api = UsersApi::new(&data);
        (data, api, auth)
    }

    fn patient_request(email: &str, national_id: &str) -> Json<CreateUserRequest> {
        Json(CreateUserRequest {
            email: email.to_string(),
            username: None,
            password: "secret123".to_string(),
            name: "Ana López".to_string(),
            role: "paciente".to_string(),
            phone: None,
            specialty: None,
            license_number: None,
            national_id: Some(national_id.to_string()),
            birth_date: None,
            gender: None,
            address: None,
        })
    }

    #[tokio::test]
    async fn admin_creates_patient_user_with_linked_patient_row() {
        let (data, api, auth) = setup().await;

        let UserCreatedResponse::Created(body) = api
            .create(auth, patient_request("ana@clinic.local", "12345678"))
            .await
            .unwrap();

        let patient_id = body.0.data.patient_id.clone().expect("patient link");
        let patient = patient::Entity::find_by_id(&patient_id)
            .one(data.users.db_for_tests())
            .await
            .unwrap()
            .expect("linked patient row");
        assert_eq!(patient.national_id, "12345678");
    }

    #[tokio::test]
    async fn non_admin_cannot_manage_users() {
        let (data, api, admin_auth) = setup().await;
        let UserCreatedResponse::Created(body) = api
            .create(
                admin_auth,
                Json(CreateUserRequest {
                    email: "front@clinic.local".to_string(),
                    username: None,
                    password: "secret123".to_string(),
                    name: "Front Desk".to_string(),
                    role: "recepcionista".to_string(),
                    phone: None,
                    specialty: None,
                    license_number: None,
                    national_id: None,
                    birth_date: None,
                    gender: None,
                    address: None,
                }),
            )
            .await
            .unwrap();
        let _ = body;

        let receptionist = data
            .users
            .find_by_identifier("front@clinic.local")
            .await
            .unwrap()
            .unwrap();
        let auth = BearerAuth(Bearer {
            token: data.tokens.issue(&receptionist).unwrap(),
        });

        let err = api.list(auth).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn approve_and_reject_transition_pending_accounts() {
        let (data, api, auth) = setup().await;

        let pending = data
            .users
            .register(crate::stores::user_store::CreateUserInput {
                email: "doc@clinic.local".to_string(),
                username: None,
                password: "secret123".to_string(),
                name: "Dr. Ruiz".to_string(),
                role: Role::Doctor,
                phone: None,
                specialty: Some("Cardiology".to_string()),
                license_number: Some("CMP-001".to_string()),
                national_id: None,
                birth_date: None,
                gender: None,
                address: None,
            })
            .await
            .unwrap();

        let approved = api.approve(auth, Path(pending.id.clone())).await.unwrap();
        assert_eq!(approved.0.data.status, "active");
        assert!(approved.0.data.doctor_id.is_some());

        let pending2 = data
            .users
            .register(crate::stores::user_store::CreateUserInput {
                email: "doc2@clinic.local".to_string(),
                username: None,
                password: "secret123".to_string(),
                name: "Dr. Sol".to_string(),
                role: Role::Doctor,
                phone: None,
                specialty: None,
                license_number: Some("CMP-002".to_string()),
                national_id: None,
                birth_date: None,
                gender: None,
                address: None,
            })
            .await
            .unwrap();

        let admin = data
            .users
            .find_by_identifier("admin@clinic.local")
            .await
            .unwrap()
            .unwrap();
        let auth = BearerAuth(Bearer {
            token: data.tokens.issue(&admin).unwrap(),
        });
        let rejected = api
            .reject(
                auth,
                Path(pending2.id.clone()),
                Json(RejectUserRequest {
                    reason: "license expired".to_string(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(rejected.0.data.status, "rejected");
        assert_eq!(
            rejected.0.data.rejection_reason.as_deref(),
            Some("license expired")
        );
    }

    #[tokio::test]
    async fn deleting_last_admin_via_api_is_conflict() {
        let (data, api, auth) = setup().await;
        let admin = data
            .users
            .find_by_identifier("admin@clinic.local")
            .await
            .unwrap()
            .unwrap();

        let err = api.delete(auth, Path(admin.id.clone())).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn set_status_validates_value() {
        let (data, api, auth) = setup().await;
        let admin = data
            .users
            .find_by_identifier("admin@clinic.local")
            .await
            .unwrap()
            .unwrap();

        let err = api
            .set_status(
                auth,
                Path(admin.id.clone()),
                Json(SetUserStatusRequest {
                    status: "vacationing".to_string(),
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
