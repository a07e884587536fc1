use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{authenticate, require_admin, require_medical_staff, BearerAuth};
use crate::app_data::AppData;
use crate::errors::ApiError;
use crate::services::{AuditLogger, TokenService};
use crate::stores::medical_record_store::{CreateMedicalRecordInput, UpdateMedicalRecordInput};
use crate::stores::{MedicalRecordStore, UserStore};
use crate::types::dto::common::MessageEnvelope;
use crate::types::dto::medical_records::{
    CreateMedicalRecordRequest, MedicalRecordCreatedResponse, MedicalRecordEnvelope,
    MedicalRecordListEnvelope, UpdateMedicalRecordRequest,
};

/// Medical history API (admin and doctors)
pub struct MedicalRecordsApi {
    medical_records: Arc<MedicalRecordStore>,
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
    audit: Arc<AuditLogger>,
}

impl MedicalRecordsApi {
    pub fn new(data: &AppData) -> Self {
        Self {
            medical_records: Arc::clone(&data.medical_records),
            users: Arc::clone(&data.users),
            tokens: Arc::clone(&data.tokens),
            audit: Arc::clone(&data.audit),
        }
    }
}

#[derive(Tags)]
enum MedicalRecordTags {
    /// Medical history endpoints
    MedicalRecords,
}

#[OpenApi]
impl MedicalRecordsApi {
    /// List all records
    #[oai(path = "/historial", method = "get", tag = "MedicalRecordTags::MedicalRecords")]
    pub async fn list(&self, auth: BearerAuth) -> Result<Json<MedicalRecordListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_medical_staff(&principal)?;

        let records = self.medical_records.list().await?;
        Ok(Json(MedicalRecordListEnvelope::ok(
            "Medical records retrieved",
            records.into_iter().map(Into::into).collect(),
        )))
    }

    /// History of one patient
    #[oai(
        path = "/historial/paciente/:paciente_id",
        method = "get",
        tag = "MedicalRecordTags::MedicalRecords"
    )]
    pub async fn list_by_patient(
        &self,
        auth: BearerAuth,
        paciente_id: Path<String>,
    ) -> Result<Json<MedicalRecordListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_medical_staff(&principal)?;

        let records = self.medical_records.list_by_patient(&paciente_id.0).await?;
        Ok(Json(MedicalRecordListEnvelope::ok(
            "Medical records retrieved",
            records.into_iter().map(Into::into).collect(),
        )))
    }

    /// Fetch a single record
    #[oai(path = "/historial/:id", method = "get", tag = "MedicalRecordTags::MedicalRecords")]
    pub async fn get(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MedicalRecordEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_medical_staff(&principal)?;

        let record = self.medical_records.get(&id.0).await?;
        Ok(Json(MedicalRecordEnvelope::ok(
            "Medical record retrieved",
            record.into(),
        )))
    }

    /// Create a record
    #[oai(path = "/historial", method = "post", tag = "MedicalRecordTags::MedicalRecords")]
    pub async fn create(
        &self,
        auth: BearerAuth,
        body: Json<CreateMedicalRecordRequest>,
    ) -> Result<MedicalRecordCreatedResponse, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_medical_staff(&principal)?;

        let created = self
            .medical_records
            .create(CreateMedicalRecordInput {
                patient_id: body.patient_id.clone(),
                doctor_id: body.doctor_id.clone(),
                date: body.date.clone(),
                diagnosis: body.diagnosis.clone(),
                treatment: body.treatment.clone(),
                prescription: body.prescription.clone(),
                attachments: body.attachments.clone().unwrap_or_default(),
                notes: body.notes.clone(),
            })
            .await?;

        self.audit.log(
            &principal,
            "CREATE",
            "Historial",
            format!("created medical record {}", created.id),
        );

        Ok(MedicalRecordCreatedResponse::Created(Json(
            MedicalRecordEnvelope::ok("Medical record created", created.into()),
        )))
    }

    /// Update a record
    #[oai(path = "/historial/:id", method = "put", tag = "MedicalRecordTags::MedicalRecords")]
    pub async fn update(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        body: Json<UpdateMedicalRecordRequest>,
    ) -> Result<Json<MedicalRecordEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_medical_staff(&principal)?;

        let updated = self
            .medical_records
            .update(
                &id.0,
                UpdateMedicalRecordInput {
                    date: body.date.clone(),
                    diagnosis: body.diagnosis.clone(),
                    treatment: body.treatment.clone(),
                    prescription: body.prescription.clone(),
                    attachments: body.attachments.clone(),
                    notes: body.notes.clone(),
                },
            )
            .await?;

        self.audit.log(
            &principal,
            "UPDATE",
            "Historial",
            format!("updated medical record {}", updated.id),
        );

        Ok(Json(MedicalRecordEnvelope::ok(
            "Medical record updated",
            updated.into(),
        )))
    }

    /// Delete a record (admin only)
    #[oai(
        path = "/historial/:id",
        method = "delete",
        tag = "MedicalRecordTags::MedicalRecords"
    )]
    pub async fn delete(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        self.medical_records.delete(&id.0).await?;

        self.audit.log(
            &principal,
            "DELETE",
            "Historial",
            format!("deleted medical record {}", id.0),
        );

        Ok(Json(MessageEnvelope::ok("Medical record deleted")))
    }
}
