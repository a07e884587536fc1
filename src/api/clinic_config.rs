use poem_openapi::{payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{authenticate, require_admin, BearerAuth};
use crate::app_data::AppData;
use crate::errors::ApiError;
use crate::services::{AuditLogger, TokenService};
use crate::stores::clinic_config_store::UpdateClinicConfigInput;
use crate::stores::{ClinicConfigStore, UserStore};
use crate::types::dto::clinic_config::{
    ClinicConfigEnvelope, UpdateClinicConfigRequest,
};

/// Clinic configuration API
pub struct ClinicConfigApi {
    clinic_config: Arc<ClinicConfigStore>,
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
    audit: Arc<AuditLogger>,
}

impl ClinicConfigApi {
    pub fn new(data: &AppData) -> Self {
        Self {
            clinic_config: Arc::clone(&data.clinic_config),
            users: Arc::clone(&data.users),
            tokens: Arc::clone(&data.tokens),
            audit: Arc::clone(&data.audit),
        }
    }
}

#[derive(Tags)]
enum ClinicConfigTags {
    /// Clinic configuration endpoints
    Configuration,
}

#[OpenApi]
impl ClinicConfigApi {
    /// Read the clinic configuration (any authenticated user)
    #[oai(path = "/configuracion", method = "get", tag = "ClinicConfigTags::Configuration")]
    pub async fn get(&self, auth: BearerAuth) -> Result<Json<ClinicConfigEnvelope>, ApiError> {
        authenticate(&self.users, &self.tokens, &auth.0).await?;

        let config = self.clinic_config.get_or_create().await?;
        Ok(Json(ClinicConfigEnvelope::ok(
            "Configuration retrieved",
            config.into(),
        )))
    }

    /// Update the clinic configuration (admin only)
    #[oai(path = "/configuracion", method = "put", tag = "ClinicConfigTags::Configuration")]
    pub async fn update(
        &self,
        auth: BearerAuth,
        body: Json<UpdateClinicConfigRequest>,
    ) -> Result<Json<ClinicConfigEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        let updated = self
            .clinic_config
            .update(UpdateClinicConfigInput {
                name: body.name.clone(),
                address: body.address.clone(),
                phone: body.phone.clone(),
                email: body.email.clone(),
                business_hours: body.business_hours.clone(),
                currency: body.currency.clone(),
                logo: body.logo.clone(),
            })
            .await?;

        self.audit.log(
            &principal,
            "UPDATE",
            "Configuracion",
            "updated clinic configuration",
        );

        Ok(Json(ClinicConfigEnvelope::ok(
            "Configuration updated",
            updated.into(),
        )))
    }
}
