use poem_openapi::{payload::Json, ApiResponse, Object};

use crate::types::db::doctor;

#[derive(Object, Debug, Clone)]
pub struct DoctorData {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub license_number: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: bool,
    pub created_at: i64,
}

impl From<doctor::Model> for DoctorData {
    fn from(model: doctor::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            specialty: model.specialty,
            license_number: model.license_number,
            phone: model.phone,
            email: model.email,
            active: model.active,
            created_at: model.created_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialty: String,
    pub license_number: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Object, Debug)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
}

#[derive(Object, Debug)]
pub struct DoctorEnvelope {
    pub success: bool,
    pub message: String,
    pub data: DoctorData,
}

impl DoctorEnvelope {
    pub fn ok(message: impl Into<String>, data: DoctorData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Object, Debug)]
pub struct DoctorListEnvelope {
    pub success: bool,
    pub message: String,
    pub data: Vec<DoctorData>,
}

impl DoctorListEnvelope {
    pub fn ok(message: impl Into<String>, data: Vec<DoctorData>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, ApiResponse)]
pub enum DoctorCreatedResponse {
    #[oai(status = 201)]
    Created(Json<DoctorEnvelope>),
}
