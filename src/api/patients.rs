use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{authenticate, require_admin, require_clinic_staff, require_staff, BearerAuth};
use crate::app_data::AppData;
use crate::errors::ApiError;
use crate::services::{AuditLogger, TokenService};
use crate::stores::patient_store::{CreatePatientInput, UpdatePatientInput};
use crate::stores::{PatientStore, UserStore};
use crate::types::dto::common::MessageEnvelope;
use crate::types::dto::patients::{
    CreatePatientRequest, PatientCreatedResponse, PatientEnvelope, PatientListEnvelope,
    UpdatePatientRequest,
};

/// Patient management API
pub struct PatientsApi {
    patients: Arc<PatientStore>,
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
    audit: Arc<AuditLogger>,
}

impl PatientsApi {
    pub fn new(data: &AppData) -> Self {
        Self {
            patients: Arc::clone(&data.patients),
            users: Arc::clone(&data.users),
            tokens: Arc::clone(&data.tokens),
            audit: Arc::clone(&data.audit),
        }
    }
}

#[derive(Tags)]
enum PatientTags {
    /// Patient management endpoints
    Patients,
}

#[OpenApi]
impl PatientsApi {
    /// List all patients (staff only)
    #[oai(path = "/pacientes", method = "get", tag = "PatientTags::Patients")]
    pub async fn list(&self, auth: BearerAuth) -> Result<Json<PatientListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_clinic_staff(&principal)?;

        let patients = self.patients.list().await?;
        Ok(Json(PatientListEnvelope::ok(
            "Patients retrieved",
            patients.into_iter().map(Into::into).collect(),
        )))
    }

    /// Fetch a single patient (staff only)
    #[oai(path = "/pacientes/:id", method = "get", tag = "PatientTags::Patients")]
    pub async fn get(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<PatientEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_clinic_staff(&principal)?;

        let patient = self.patients.get(&id.0).await?;
        Ok(Json(PatientEnvelope::ok("Patient retrieved", patient.into())))
    }

    /// Register a patient (admin and receptionist)
    #[oai(path = "/pacientes", method = "post", tag = "PatientTags::Patients")]
    pub async fn create(
        &self,
        auth: BearerAuth,
        body: Json<CreatePatientRequest>,
    ) -> Result<PatientCreatedResponse, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_staff(&principal)?;

        let created = self
            .patients
            .create(CreatePatientInput {
                name: body.name.clone(),
                national_id: body.national_id.clone(),
                birth_date: body.birth_date.clone(),
                gender: body.gender.clone(),
                phone: body.phone.clone(),
                email: body.email.clone(),
                address: body.address.clone(),
                blood_type: body.blood_type.clone(),
                allergies: body.allergies.clone(),
                emergency_contact: body.emergency_contact.clone(),
            })
            .await?;

        self.audit.log(
            &principal,
            "CREATE",
            "Paciente",
            format!("created patient {} ({})", created.name, created.id),
        );

        Ok(PatientCreatedResponse::Created(Json(PatientEnvelope::ok(
            "Patient created",
            created.into(),
        ))))
    }

    /// Update a patient (admin and receptionist)
    #[oai(path = "/pacientes/:id", method = "put", tag = "PatientTags::Patients")]
    pub async fn update(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        body: Json<UpdatePatientRequest>,
    ) -> Result<Json<PatientEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_staff(&principal)?;

        let updated = self
            .patients
            .update(
                &id.0,
                UpdatePatientInput {
                    name: body.name.clone(),
                    national_id: body.national_id.clone(),
                    birth_date: body.birth_date.clone(),
                    gender: body.gender.clone(),
                    phone: body.phone.clone(),
                    email: body.email.clone(),
                    address: body.address.clone(),
                    blood_type: body.blood_type.clone(),
                    allergies: body.allergies.clone(),
                    emergency_contact: body.emergency_contact.clone(),
                    active: body.active,
                },
            )
            .await?;

        self.audit.log(
            &principal,
            "UPDATE",
            "Paciente",
            format!("updated patient {}", updated.id),
        );

        Ok(Json(PatientEnvelope::ok("Patient updated", updated.into())))
    }

    /// Delete a patient (admin only)
    #[oai(path = "/pacientes/:id", method = "delete", tag = "PatientTags::Patients")]
    pub async fn delete(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        self.patients.delete(&id.0).await?;

        self.audit.log(
            &principal,
            "DELETE",
            "Paciente",
            format!("deleted patient {}", id.0),
        );

        Ok(Json(MessageEnvelope::ok("Patient deleted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::services::LogMailer;
    use crate::stores::user_store::CreateUserInput;
    use crate::types::internal::scope::{Role, UserStatus};
    use migration::{Migrator, MigratorTrait};
    use poem_openapi::auth::Bearer;
    use sea_orm::Database;

    async fn setup() -> (AppData, PatientsApi) {
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
        let api = PatientsApi::new(&data);
        (data, api)
    }

    async fn token_for(data: &AppData, email: &str, role: Role) -> BearerAuth {
        let user = data
            .users
            .create(
                CreateUserInput {
                    email: email.to_string(),
                    username: None,
                    password: "secret123".to_string(),
                    name: format!("User {email}"),
                    role,
                    phone: None,
                    specialty: None,
                    license_number: None,
                    national_id: if role == Role::Patient {
                        Some(format!("NID-{email}"))
                    } else {
                        None
                    },
                    birth_date: None,
                    gender: None,
                    address: None,
                },
                UserStatus::Active,
            )
            .await
            .unwrap();
        let user = data.users.ensure_doctor_link(user).await.unwrap();
        let token = data.tokens.issue(&user).unwrap();
        BearerAuth(Bearer { token })
    }

    fn create_request(name: &str, national_id: &str) -> Json<CreatePatientRequest> {
        Json(CreatePatientRequest {
            name: name.to_string(),
            national_id: national_id.to_string(),
            birth_date: None,
            gender: None,
            phone: None,
            email: None,
            address: None,
            blood_type: None,
            allergies: None,
            emergency_contact: None,
        })
    }

    #[tokio::test]
    async fn receptionist_creates_and_lists_patients() {
        let (data, api) = setup().await;
        let auth = token_for(&data, "front@clinic.local", Role::Receptionist).await;

        let created = api
            .create(auth, create_request("Ana López", "12345678"))
            .await;
        assert!(created.is_ok());

        let auth = token_for(&data, "front2@clinic.local", Role::Receptionist).await;
        let list = api.list(auth).await.unwrap();
        assert_eq!(list.0.data.len(), 1);
        assert_eq!(list.0.data[0].national_id, "12345678");
    }

    #[tokio::test]
    async fn patient_role_cannot_list_patients() {
        let (data, api) = setup().await;
        let auth = token_for(&data, "pat@clinic.local", Role::Patient).await;

        let err = api.list(auth).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn doctor_can_read_but_not_create() {
        let (data, api) = setup().await;
        let auth = token_for(&data, "doc@clinic.local", Role::Doctor).await;
        assert!(api.list(auth).await.is_ok());

        let auth = token_for(&data, "doc2@clinic.local", Role::Doctor).await;
        let err = api
            .create(auth, create_request("Ana", "111"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn delete_requires_admin() {
        let (data, api) = setup().await;
        let staff = token_for(&data, "front@clinic.local", Role::Receptionist).await;
        let created = match api.create(staff, create_request("Ana", "111")).await.unwrap() {
            PatientCreatedResponse::Created(body) => body.0.data.id.clone(),
        };

        let staff = token_for(&data, "front2@clinic.local", Role::Receptionist).await;
        let err = api
            .delete(staff, Path(created.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let admin = token_for(&data, "admin@clinic.local", Role::Admin).await;
        assert!(api.delete(admin, Path(created)).await.is_ok());
    }

    #[tokio::test]
    async fn requests_without_valid_token_are_401() {
        let (_data, api) = setup().await;
        let auth = BearerAuth(Bearer {
            token: "garbage".to_string(),
        });
        let err = api.list(auth).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
