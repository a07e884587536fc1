use poem_openapi::{payload::Json, ApiResponse, Object};

use super::users::UserData;

/// Request model for public staff self-registration
#[derive(Object, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
    pub name: String,
    /// "medico" or "recepcionista"; patients cannot self-register
    pub role: String,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
}

/// Request model for login
#[derive(Object, Debug)]
pub struct LoginRequest {
    /// Username or email
    pub username_or_email: String,
    pub password: String,
}

#[derive(Object, Debug)]
pub struct LoginData {
    /// Signed bearer token
    pub token: String,
    pub user: UserData,
}

#[derive(Object, Debug)]
pub struct LoginEnvelope {
    pub success: bool,
    pub message: String,
    pub data: LoginData,
}

impl LoginEnvelope {
    pub fn ok(message: impl Into<String>, data: LoginData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Request model for token verification
#[derive(Object, Debug)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Object, Debug)]
pub struct VerifyEnvelope {
    pub success: bool,
    pub message: String,
    pub data: UserData,
}

impl VerifyEnvelope {
    pub fn ok(message: impl Into<String>, data: UserData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Object, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Object, Debug)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Registration response (201)
#[derive(Debug, ApiResponse)]
pub enum RegisterResponse {
    #[oai(status = 201)]
    Created(Json<super::users::UserEnvelope>),
}
