use std::fmt;

use crate::types::db::user;

/// Account roles, stored with their Spanish wire values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Doctor,
    Receptionist,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Doctor => "medico",
            Self::Receptionist => "recepcionista",
            Self::Patient => "paciente",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "medico" => Some(Self::Doctor),
            "recepcionista" => Some(Self::Receptionist),
            "paciente" => Some(Self::Patient),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
    Pending,
    Rejected,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "pending" => Some(Self::Pending),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated identity attached to a request after token verification
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
}

impl Principal {
    /// Build a principal from a verified, active user row
    ///
    /// Fails when the stored role string is not one of the known roles.
    pub fn from_user(user: &user::Model) -> Option<Self> {
        let role = Role::parse(&user.role)?;
        Some(Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role,
            doctor_id: user.doctor_id.clone(),
            patient_id: user.patient_id.clone(),
        })
    }

    /// Resolve the capability variant consumed by every role-scoped read/write
    /// path. All role dispatch goes through this single function.
    pub fn scope(&self) -> AccessScope {
        match self.role {
            Role::Admin => AccessScope::Admin,
            Role::Receptionist => AccessScope::Receptionist,
            Role::Doctor => AccessScope::Doctor {
                doctor_id: self.doctor_id.clone().unwrap_or_default(),
            },
            Role::Patient => AccessScope::Patient {
                patient_id: self.patient_id.clone().unwrap_or_default(),
            },
        }
    }
}

/// Capability variant derived from the principal's role.
///
/// Staff scopes see everything; doctor and patient scopes are pinned to
/// their linked record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    Admin,
    Receptionist,
    Doctor { doctor_id: String },
    Patient { patient_id: String },
}

impl AccessScope {
    /// Unrestricted read/write over clinic resources
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::Receptionist)
    }

    /// Whether this scope may see the given appointment ownership pair
    pub fn can_view_appointment(&self, doctor_id: &str, patient_id: &str) -> bool {
        match self {
            Self::Admin | Self::Receptionist => true,
            Self::Doctor { doctor_id: own } => own == doctor_id,
            Self::Patient { patient_id: own } => own == patient_id,
        }
    }
}
