use poem_openapi::{payload::Json, ApiResponse, Object};

use crate::types::db::patient;

#[derive(Object, Debug, Clone)]
pub struct PatientData {
    pub id: String,
    pub name: String,
    pub national_id: String,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    pub active: bool,
    pub created_at: i64,
}

impl From<patient::Model> for PatientData {
    fn from(model: patient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            national_id: model.national_id,
            birth_date: model.birth_date,
            gender: model.gender,
            phone: model.phone,
            email: model.email,
            address: model.address,
            blood_type: model.blood_type,
            allergies: model.allergies,
            emergency_contact: model.emergency_contact,
            active: model.active,
            created_at: model.created_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct CreatePatientRequest {
    pub name: String,
    pub national_id: String,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
}

#[derive(Object, Debug)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub national_id: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    pub active: Option<bool>,
}

#[derive(Object, Debug)]
pub struct PatientEnvelope {
    pub success: bool,
    pub message: String,
    pub data: PatientData,
}

impl PatientEnvelope {
    pub fn ok(message: impl Into<String>, data: PatientData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Object, Debug)]
pub struct PatientListEnvelope {
    pub success: bool,
    pub message: String,
    pub data: Vec<PatientData>,
}

impl PatientListEnvelope {
    pub fn ok(message: impl Into<String>, data: Vec<PatientData>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, ApiResponse)]
pub enum PatientCreatedResponse {
    #[oai(status = 201)]
    Created(Json<PatientEnvelope>),
}
