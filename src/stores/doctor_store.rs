use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::types::db::{appointment, doctor, medical_record, user};

#[derive(Debug, Clone, Default)]
pub struct CreateDoctorInput {
    pub name: String,
    pub specialty: String,
    pub license_number: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDoctorInput {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
}

/// Repository for doctor records
pub struct DoctorStore {
    db: DatabaseConnection,
}

impl DoctorStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<doctor::Model>, ApiError> {
        doctor::Entity::find()
            .order_by_asc(doctor::Column::Name)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_doctors", e))
    }

    pub async fn get(&self, id: &str) -> Result<doctor::Model, ApiError> {
        doctor::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("get_doctor", e))?
            .ok_or_else(|| ApiError::not_found("Doctor not found"))
    }

    /// Create a doctor, enforcing license-number uniqueness
    pub async fn create(&self, input: CreateDoctorInput) -> Result<doctor::Model, ApiError> {
        if input.name.trim().is_empty() || input.license_number.trim().is_empty() {
            return Err(ApiError::validation_fields(
                "Validation failed",
                vec!["name and license_number are required".to_string()],
            ));
        }

        let duplicate = doctor::Entity::find()
            .filter(doctor::Column::LicenseNumber.eq(&input.license_number))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("check_doctor_license", e))?;
        if duplicate.is_some() {
            return Err(ApiError::conflict(
                "A doctor with that license number already exists",
            ));
        }

        let row = doctor::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(input.name),
            specialty: Set(input.specialty),
            license_number: Set(input.license_number),
            phone: Set(input.phone),
            email: Set(input.email),
            active: Set(true),
            created_at: Set(Utc::now().timestamp()),
        };

        row.insert(&self.db)
            .await
            .map_err(|e| ApiError::from_db("create_doctor", e))
    }

    /// Partial update; re-checks license uniqueness when it changes
    pub async fn update(
        &self,
        id: &str,
        input: UpdateDoctorInput,
    ) -> Result<doctor::Model, ApiError> {
        let existing = self.get(id).await?;

        if let Some(license) = &input.license_number {
            if license != &existing.license_number {
                let duplicate = doctor::Entity::find()
                    .filter(doctor::Column::LicenseNumber.eq(license))
                    .filter(doctor::Column::Id.ne(id))
                    .one(&self.db)
                    .await
                    .map_err(|e| ApiError::from_db("check_doctor_license", e))?;
                if duplicate.is_some() {
                    return Err(ApiError::conflict(
                        "A doctor with that license number already exists",
                    ));
                }
            }
        }

        let mut row = existing.into_active_model();
        if let Some(name) = input.name {
            row.name = Set(name);
        }
        if let Some(specialty) = input.specialty {
            row.specialty = Set(specialty);
        }
        if let Some(license) = input.license_number {
            row.license_number = Set(license);
        }
        if let Some(phone) = input.phone {
            row.phone = Set(Some(phone));
        }
        if let Some(email) = input.email {
            row.email = Set(Some(email));
        }
        if let Some(active) = input.active {
            row.active = Set(active);
        }

        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("update_doctor", e))
    }

    /// Hard delete; dependent appointments and records are removed and any
    /// linked user account is unlinked.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.get(id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::from_db("begin_delete_doctor", e))?;

        user::Entity::update_many()
            .col_expr(user::Column::DoctorId, sea_orm::sea_query::Expr::value(Option::<String>::None))
            .filter(user::Column::DoctorId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::from_db("unlink_doctor_users", e))?;

        appointment::Entity::delete_many()
            .filter(appointment::Column::DoctorId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::from_db("delete_doctor_appointments", e))?;

        medical_record::Entity::delete_many()
            .filter(medical_record::Column::DoctorId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::from_db("delete_doctor_records", e))?;

        doctor::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::from_db("delete_doctor", e))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::from_db("commit_delete_doctor", e))
    }
}
