use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;

use crate::errors::ApiError;
use crate::types::db::user;
use crate::types::internal::auth::Claims;

/// Manages JWT generation and validation
pub struct TokenService {
    jwt_secret: String,
    expiration_hours: i64,
}

impl TokenService {
    pub fn new(jwt_secret: String, expiration_hours: i64) -> Self {
        Self {
            jwt_secret,
            expiration_hours,
        }
    }

    /// Issue a signed token for an authenticated user
    ///
    /// The claims embed role and linked doctor/patient ids so the
    /// authorization layer can derive an access scope from the token alone.
    pub fn issue(&self, user: &user::Model) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            doctor_id: user.doctor_id.clone(),
            patient_id: user.patient_id.clone(),
            exp: now + self.expiration_hours * 3600,
            iat: now,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "failed to sign token");
            ApiError::internal("Internal server error")
        })
    }

    /// Validate a token and return the claims
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            if matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            ) {
                ApiError::unauthorized("Token has expired")
            } else {
                ApiError::invalid_token()
            }
        })?;

        Ok(token_data.claims)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("jwt_secret", &"<redacted>")
            .field("expiration_hours", &self.expiration_hours)
            .finish()
    }
}
