use serde::{Deserialize, Serialize};

/// JWT Claims structure
///
/// Besides the registered claims, the token carries everything the
/// authorization layer needs to derive an access scope without a second
/// database round-trip: role and the optional linked doctor/patient ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Username, if the account has one
    pub username: Option<String>,

    /// Account email
    pub email: String,

    /// Role string ("admin", "medico", "recepcionista", "paciente")
    pub role: String,

    /// Linked doctor id for doctor-role users
    pub doctor_id: Option<String>,

    /// Linked patient id for patient-role users
    pub patient_id: Option<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}
