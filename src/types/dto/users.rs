use poem_openapi::{payload::Json, ApiResponse, Object};

use crate::types::db::user;

/// Public view of a user account; password and reset-token material never
/// leave the server.
#[derive(Object, Debug, Clone)]
pub struct UserData {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub name: String,
    pub role: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub last_login_at: Option<i64>,
    pub created_at: i64,
}

impl From<user::Model> for UserData {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            username: model.username,
            name: model.name,
            role: model.role,
            status: model.status,
            rejection_reason: model.rejection_reason,
            phone: model.phone,
            specialty: model.specialty,
            license_number: model.license_number,
            doctor_id: model.doctor_id,
            patient_id: model.patient_id,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
    pub name: String,
    /// "admin", "medico", "recepcionista" or "paciente"
    pub role: String,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    /// Required when role is "paciente"
    pub national_id: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

#[derive(Object, Debug)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
}

#[derive(Object, Debug)]
pub struct RejectUserRequest {
    pub reason: String,
}

#[derive(Object, Debug)]
pub struct SetUserStatusRequest {
    /// "active" or "inactive"
    pub status: String,
}

#[derive(Object, Debug)]
pub struct UserEnvelope {
    pub success: bool,
    pub message: String,
    pub data: UserData,
}

impl UserEnvelope {
    pub fn ok(message: impl Into<String>, data: UserData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Object, Debug)]
pub struct UserListEnvelope {
    pub success: bool,
    pub message: String,
    pub data: Vec<UserData>,
}

impl UserListEnvelope {
    pub fn ok(message: impl Into<String>, data: Vec<UserData>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Creation response (201)
#[derive(ApiResponse)]
pub enum UserCreatedResponse {
    #[oai(status = 201)]
    Created(Json<UserEnvelope>),
}
