use poem_openapi::{payload::Json, ApiResponse, Object};

use crate::stores::medical_record_store::MedicalRecordStore;
use crate::types::db::medical_record;

#[derive(Object, Debug, Clone)]
pub struct MedicalRecordData {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub date: String,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub attachments: Vec<String>,
    pub notes: Option<String>,
    pub created_at: i64,
}

impl From<medical_record::Model> for MedicalRecordData {
    fn from(model: medical_record::Model) -> Self {
        let attachments = MedicalRecordStore::decode_attachments(&model.attachments);
        Self {
            id: model.id,
            patient_id: model.patient_id,
            doctor_id: model.doctor_id,
            date: model.date,
            diagnosis: model.diagnosis,
            treatment: model.treatment,
            prescription: model.prescription,
            attachments,
            notes: model.notes,
            created_at: model.created_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct CreateMedicalRecordRequest {
    pub patient_id: String,
    pub doctor_id: String,
    /// "YYYY-MM-DD"
    pub date: String,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Object, Debug)]
pub struct UpdateMedicalRecordRequest {
    pub date: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Object, Debug)]
pub struct MedicalRecordEnvelope {
    pub success: bool,
    pub message: String,
    pub data: MedicalRecordData,
}

impl MedicalRecordEnvelope {
    pub fn ok(message: impl Into<String>, data: MedicalRecordData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Object, Debug)]
pub struct MedicalRecordListEnvelope {
    pub success: bool,
    pub message: String,
    pub data: Vec<MedicalRecordData>,
}

impl MedicalRecordListEnvelope {
    pub fn ok(message: impl Into<String>, data: Vec<MedicalRecordData>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(ApiResponse)]
pub enum MedicalRecordCreatedResponse {
    #[oai(status = 201)]
    Created(Json<MedicalRecordEnvelope>),
}
