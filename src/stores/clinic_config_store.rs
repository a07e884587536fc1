use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};

use crate::errors::ApiError;
use crate::types::db::clinic_config;

/// The configuration table holds exactly one row with this id
const SINGLETON_ID: i32 = 1;

#[derive(Debug, Clone, Default)]
pub struct UpdateClinicConfigInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub business_hours: Option<String>,
    pub currency: Option<String>,
    pub logo: Option<String>,
}

/// Repository for the singleton clinic configuration row, created lazily
/// with defaults on first read.
pub struct ClinicConfigStore {
    db: DatabaseConnection,
}

impl ClinicConfigStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_or_create(&self) -> Result<clinic_config::Model, ApiError> {
        let existing = clinic_config::Entity::find_by_id(SINGLETON_ID)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("get_clinic_config", e))?;

        if let Some(config) = existing {
            return Ok(config);
        }

        let defaults = clinic_config::ActiveModel {
            id: Set(SINGLETON_ID),
            name: Set("Clinic".to_string()),
            address: Set(String::new()),
            phone: Set(String::new()),
            email: Set(String::new()),
            business_hours: Set("Mon-Fri 09:00-18:00".to_string()),
            currency: Set("$".to_string()),
            logo: Set(None),
            updated_at: Set(Utc::now().timestamp()),
        };

        defaults
            .insert(&self.db)
            .await
            .map_err(|e| ApiError::from_db("create_clinic_config", e))
    }

    pub async fn update(
        &self,
        input: UpdateClinicConfigInput,
    ) -> Result<clinic_config::Model, ApiError> {
        let existing = self.get_or_create().await?;
        let mut row = existing.into_active_model();

        if let Some(name) = input.name {
            row.name = Set(name);
        }
        if let Some(address) = input.address {
            row.address = Set(address);
        }
        if let Some(phone) = input.phone {
            row.phone = Set(phone);
        }
        if let Some(email) = input.email {
            row.email = Set(email);
        }
        if let Some(business_hours) = input.business_hours {
            row.business_hours = Set(business_hours);
        }
        if let Some(currency) = input.currency {
            row.currency = Set(currency);
        }
        if let Some(logo) = input.logo {
            row.logo = Set(Some(logo));
        }
        row.updated_at = Set(Utc::now().timestamp());

        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("update_clinic_config", e))
    }
}
