use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{authenticate, require_admin, BearerAuth};
use crate::app_data::AppData;
use crate::errors::ApiError;
use crate::services::{AuditLogger, TokenService};
use crate::stores::doctor_store::{CreateDoctorInput, UpdateDoctorInput};
use crate::stores::{DoctorStore, UserStore};
use crate::types::dto::common::MessageEnvelope;
use crate::types::dto::doctors::{
    CreateDoctorRequest, DoctorCreatedResponse, DoctorEnvelope, DoctorListEnvelope,
    UpdateDoctorRequest,
};

/// Doctor management API
pub struct DoctorsApi {
    doctors: Arc<DoctorStore>,
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
    audit: Arc<AuditLogger>,
}

impl DoctorsApi {
    pub fn new(data: &AppData) -> Self {
        Self {
            doctors: Arc::clone(&data.doctors),
            users: Arc::clone(&data.users),
            tokens: Arc::clone(&data.tokens),
            audit: Arc::clone(&data.audit),
        }
    }
}

#[derive(Tags)]
enum DoctorTags {
    /// Doctor management endpoints
    Doctors,
}

#[OpenApi]
impl DoctorsApi {
    /// List all doctors (any authenticated user)
    #[oai(path = "/medicos", method = "get", tag = "DoctorTags::Doctors")]
    pub async fn list(&self, auth: BearerAuth) -> Result<Json<DoctorListEnvelope>, ApiError> {
        authenticate(&self.users, &self.tokens, &auth.0).await?;

        let doctors = self.doctors.list().await?;
        Ok(Json(DoctorListEnvelope::ok(
            "Doctors retrieved",
            doctors.into_iter().map(Into::into).collect(),
        )))
    }

    /// Fetch a single doctor (any authenticated user)
    #[oai(path = "/medicos/:id", method = "get", tag = "DoctorTags::Doctors")]
    pub async fn get(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<DoctorEnvelope>, ApiError> {
        authenticate(&self.users, &self.tokens, &auth.0).await?;

        let doctor = self.doctors.get(&id.0).await?;
        Ok(Json(DoctorEnvelope::ok("Doctor retrieved", doctor.into())))
    }

    /// Create a doctor (admin only)
    #[oai(path = "/medicos", method = "post", tag = "DoctorTags::Doctors")]
    pub async fn create(
        &self,
        auth: BearerAuth,
        body: Json<CreateDoctorRequest>,
    ) -> Result<DoctorCreatedResponse, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let created = self
            .doctors
            .create(CreateDoctorInput {
                name: body.name.clone(),
                specialty: body.specialty.clone(),
                license_number: body.license_number.clone(),
                phone: body.phone.clone(),
                email: body.email.clone(),
            })
            .await?;

        self.audit.log(
            &principal,
            "CREATE",
            "Medico",
            format!("created doctor {} ({})", created.name, created.id),
        );

        Ok(DoctorCreatedResponse::Created(Json(DoctorEnvelope::ok(
            "Doctor created",
            created.into(),
        ))))
    }

    /// Update a doctor (admin only)
    #[oai(path = "/medicos/:id", method = "put", tag = "DoctorTags::Doctors")]
    pub async fn update(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        body: Json<UpdateDoctorRequest>,
    ) -> Result<Json<DoctorEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let updated = self
            .doctors
            .update(
                &id.0,
                UpdateDoctorInput {
                    name: body.name.clone(),
                    specialty: body.specialty.clone(),
                    license_number: body.license_number.clone(),
                    phone: body.phone.clone(),
                    email: body.email.clone(),
                    active: body.active,
                },
            )
            .await?;

        self.audit.log(
            &principal,
            "UPDATE",
            "Medico",
            format!("updated doctor {}", updated.id),
        );

        Ok(Json(DoctorEnvelope::ok("Doctor updated", updated.into())))
    }

    /// Delete a doctor (admin only)
    #[oai(path = "/medicos/:id", method = "delete", tag = "DoctorTags::Doctors")]
    pub async fn delete(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        self.doctors.delete(&id.0).await?;

        self.audit.log(
            &principal,
            "DELETE",
            "Medico",
            format!("deleted doctor {}", id.0),
        );

        Ok(Json(MessageEnvelope::ok("Doctor deleted")))
    }
}
