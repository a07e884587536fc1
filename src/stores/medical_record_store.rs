use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::types::db::{doctor, medical_record, patient};

#[derive(Debug, Clone, Default)]
pub struct CreateMedicalRecordInput {
    pub patient_id: String,
    pub doctor_id: String,
    pub date: String,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub attachments: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMedicalRecordInput {
    pub date: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Repository for medical history records
pub struct MedicalRecordStore {
    db: DatabaseConnection,
}

impl MedicalRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn encode_attachments(attachments: &[String]) -> Result<String, ApiError> {
        serde_json::to_string(attachments).map_err(|e| {
            tracing::error!(error = %e, "failed to serialize attachments");
            ApiError::internal("Internal server error")
        })
    }

    /// Decode the stored JSON attachment list; rows written by this store
    /// always hold a valid array.
    pub fn decode_attachments(raw: &str) -> Vec<String> {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub async fn list(&self) -> Result<Vec<medical_record::Model>, ApiError> {
        medical_record::Entity::find()
            .order_by_desc(medical_record::Column::Date)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_medical_records", e))
    }

    pub async fn get(&self, id: &str) -> Result<medical_record::Model, ApiError> {
        medical_record::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("get_medical_record", e))?
            .ok_or_else(|| ApiError::not_found("Medical record not found"))
    }

    pub async fn list_by_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<medical_record::Model>, ApiError> {
        medical_record::Entity::find()
            .filter(medical_record::Column::PatientId.eq(patient_id))
            .order_by_desc(medical_record::Column::Date)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_medical_records_by_patient", e))
    }

    pub async fn list_by_doctor(
        &self,
        doctor_id: &str,
    ) -> Result<Vec<medical_record::Model>, ApiError> {
        medical_record::Entity::find()
            .filter(medical_record::Column::DoctorId.eq(doctor_id))
            .order_by_desc(medical_record::Column::Date)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_medical_records_by_doctor", e))
    }

    /// Create a record; both referenced rows are checked explicitly before
    /// the insert.
    pub async fn create(
        &self,
        input: CreateMedicalRecordInput,
    ) -> Result<medical_record::Model, ApiError> {
        let mut issues = Vec::new();
        if input.diagnosis.trim().is_empty() {
            issues.push("diagnosis is required".to_string());
        }
        if NaiveDate::parse_from_str(&input.date, "%Y-%m-%d").is_err() {
            issues.push("date must be YYYY-MM-DD".to_string());
        }
        if !issues.is_empty() {
            return Err(ApiError::validation_fields("Validation failed", issues));
        }

        patient::Entity::find_by_id(&input.patient_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("check_record_patient", e))?
            .ok_or_else(|| ApiError::not_found("Patient not found"))?;

        doctor::Entity::find_by_id(&input.doctor_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("check_record_doctor", e))?
            .ok_or_else(|| ApiError::not_found("Doctor not found"))?;

        let row = medical_record::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            patient_id: Set(input.patient_id),
            doctor_id: Set(input.doctor_id),
            date: Set(input.date),
            diagnosis: Set(input.diagnosis),
            treatment: Set(input.treatment),
            prescription: Set(input.prescription),
            attachments: Set(Self::encode_attachments(&input.attachments)?),
            notes: Set(input.notes),
            created_at: Set(Utc::now().timestamp()),
        };

        row.insert(&self.db)
            .await
            .map_err(|e| ApiError::from_db("create_medical_record", e))
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdateMedicalRecordInput,
    ) -> Result<medical_record::Model, ApiError> {
        if let Some(date) = &input.date {
            if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                return Err(ApiError::validation_fields(
                    "Validation failed",
                    vec!["date must be YYYY-MM-DD".to_string()],
                ));
            }
        }

        let existing = self.get(id).await?;
        let mut row = existing.into_active_model();
        if let Some(date) = input.date {
            row.date = Set(date);
        }
        if let Some(diagnosis) = input.diagnosis {
            row.diagnosis = Set(diagnosis);
        }
        if let Some(treatment) = input.treatment {
            row.treatment = Set(Some(treatment));
        }
        if let Some(prescription) = input.prescription {
            row.prescription = Set(Some(prescription));
        }
        if let Some(attachments) = input.attachments {
            row.attachments = Set(Self::encode_attachments(&attachments)?);
        }
        if let Some(notes) = input.notes {
            row.notes = Set(Some(notes));
        }

        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("update_medical_record", e))
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.get(id).await?;
        medical_record::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| ApiError::from_db("delete_medical_record", e))?;
        Ok(())
    }
}
