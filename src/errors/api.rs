use poem_openapi::{payload::Json, ApiResponse, Object};
use std::fmt;

/// Standard error envelope returned by every failing endpoint
#[derive(Object, Debug)]
pub struct ErrorBody {
    /// Always false on error responses
    pub success: bool,

    /// Human-readable error message
    pub message: String,

    /// Per-field validation issues, when applicable
    pub errors: Option<Vec<String>>,
}

impl ErrorBody {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }
}

/// Error taxonomy mapped onto HTTP status codes
#[derive(ApiResponse, Debug)]
pub enum ApiError {
    /// Malformed or missing input
    #[oai(status = 400)]
    Validation(Json<ErrorBody>),

    /// Missing, invalid or expired token
    #[oai(status = 401)]
    Unauthorized(Json<ErrorBody>),

    /// Authenticated but not permitted
    #[oai(status = 403)]
    Forbidden(Json<ErrorBody>),

    /// Referenced entity absent
    #[oai(status = 404)]
    NotFound(Json<ErrorBody>),

    /// Uniqueness or double-booking violation
    #[oai(status = 409)]
    Conflict(Json<ErrorBody>),

    /// Unexpected failure; detail is logged, never returned
    #[oai(status = 500)]
    Internal(Json<ErrorBody>),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(Json(ErrorBody::new(message)))
    }

    /// Validation error carrying per-field issues
    pub fn validation_fields(message: impl Into<String>, errors: Vec<String>) -> Self {
        let mut body = ErrorBody::new(message);
        body.errors = Some(errors);
        ApiError::Validation(Json(body))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(Json(ErrorBody::new(message)))
    }

    pub fn invalid_credentials() -> Self {
        Self::unauthorized("Invalid credentials")
    }

    pub fn invalid_token() -> Self {
        Self::unauthorized("Invalid or expired token")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(Json(ErrorBody::new(message)))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(Json(ErrorBody::new(message)))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(Json(ErrorBody::new(message)))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(Json(ErrorBody::new(message)))
    }

    /// Map a database error to a generic 500, logging the detail server-side
    pub fn from_db(operation: &str, err: sea_orm::DbErr) -> Self {
        tracing::error!(operation, error = %err, "database operation failed");
        Self::internal("Internal server error")
    }

    /// Get the error message from the error variant
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(json) => json.0.message.clone(),
            ApiError::Unauthorized(json) => json.0.message.clone(),
            ApiError::Forbidden(json) => json.0.message.clone(),
            ApiError::NotFound(json) => json.0.message.clone(),
            ApiError::Conflict(json) => json.0.message.clone(),
            ApiError::Internal(json) => json.0.message.clone(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_envelope_fields() {
        let err = ApiError::conflict("slot taken");
        match &err {
            ApiError::Conflict(json) => {
                assert!(!json.0.success);
                assert_eq!(json.0.message, "slot taken");
                assert!(json.0.errors.is_none());
            }
            _ => panic!("expected Conflict"),
        }
        assert_eq!(err.message(), "slot taken");
    }

    #[test]
    fn validation_fields_carries_issue_list() {
        let err = ApiError::validation_fields(
            "Validation failed",
            vec!["name is required".to_string(), "email is invalid".to_string()],
        );
        match err {
            ApiError::Validation(json) => {
                assert_eq!(json.0.errors.as_ref().map(Vec::len), Some(2));
            }
            _ => panic!("expected Validation"),
        }
    }
}
