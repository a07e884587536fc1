use poem_openapi::Object;

use crate::types::db::clinic_config;

#[derive(Object, Debug, Clone)]
pub struct ClinicConfigData {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub business_hours: String,
    pub currency: String,
    pub logo: Option<String>,
    pub updated_at: i64,
}

impl From<clinic_config::Model> for ClinicConfigData {
    fn from(model: clinic_config::Model) -> Self {
        Self {
            name: model.name,
            address: model.address,
            phone: model.phone,
            email: model.email,
            business_hours: model.business_hours,
            currency: model.currency,
            logo: model.logo,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct UpdateClinicConfigRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub business_hours: Option<String>,
    pub currency: Option<String>,
    pub logo: Option<String>,
}

#[derive(Object, Debug)]
pub struct ClinicConfigEnvelope {
    pub success: bool,
    pub message: String,
    pub data: ClinicConfigData,
}

impl ClinicConfigEnvelope {
    pub fn ok(message: impl Into<String>, data: ClinicConfigData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}
