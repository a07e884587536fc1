// API layer - HTTP endpoints
pub mod appointments;
pub mod audit;
pub mod auth;
pub mod clinic_config;
pub mod doctors;
pub mod health;
pub mod invoices;
pub mod medical_records;
pub mod patients;
pub mod users;

pub use appointments::AppointmentsApi;
pub use audit::AuditApi;
pub use auth::AuthApi;
pub use clinic_config::ClinicConfigApi;
pub use doctors::DoctorsApi;
pub use health::HealthApi;
pub use invoices::InvoicesApi;
pub use medical_records::MedicalRecordsApi;
pub use patients::PatientsApi;
pub use users::UsersApi;

use poem_openapi::{auth::Bearer, SecurityScheme};

use crate::errors::ApiError;
use crate::services::TokenService;
use crate::stores::UserStore;
use crate::types::internal::scope::{Principal, Role, UserStatus};

/// JWT Bearer token authentication
#[derive(SecurityScheme)]
#[oai(
    ty = "bearer",
    key_name = "Authorization",
    key_in = "header",
    bearer_format = "JWT"
)]
pub struct BearerAuth(pub Bearer);

/// Resolve a bearer token into a principal.
///
/// Besides the signature/expiry check, the referenced account must still
/// exist and be active; tokens of deactivated users stop working at the next
/// request.
pub(crate) async fn authenticate(
    users: &UserStore,
    tokens: &TokenService,
    bearer: &Bearer,
) -> Result<Principal, ApiError> {
    let claims = tokens.validate(&bearer.token)?;

    let user = users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(ApiError::invalid_token)?;

    if UserStatus::parse(&user.status) != Some(UserStatus::Active) {
        return Err(ApiError::invalid_token());
    }

    Principal::from_user(&user).ok_or_else(ApiError::invalid_token)
}

/// Admin only
pub(crate) fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    if principal.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator access required"))
    }
}

/// Admin or receptionist
pub(crate) fn require_staff(principal: &Principal) -> Result<(), ApiError> {
    if matches!(principal.role, Role::Admin | Role::Receptionist) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Staff access required"))
    }
}

/// Admin, receptionist or doctor
pub(crate) fn require_clinic_staff(principal: &Principal) -> Result<(), ApiError> {
    if matches!(
        principal.role,
        Role::Admin | Role::Receptionist | Role::Doctor
    ) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Staff access required"))
    }
}

/// Admin or doctor
pub(crate) fn require_medical_staff(principal: &Principal) -> Result<(), ApiError> {
    if matches!(principal.role, Role::Admin | Role::Doctor) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Medical staff access required"))
    }
}
