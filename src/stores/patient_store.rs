use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::types::db::{appointment, invoice, medical_record, patient};

/// Fields accepted when registering a patient
#[derive(Debug, Clone, Default)]
pub struct CreatePatientInput {
    pub name: String,
    pub national_id: String,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
}

/// Partial update; only supplied fields change
#[derive(Debug, Clone, Default)]
pub struct UpdatePatientInput {
    pub name: Option<String>,
    pub national_id: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    pub active: Option<bool>,
}

/// Repository for patient records
pub struct PatientStore {
    db: DatabaseConnection,
}

impl PatientStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<patient::Model>, ApiError> {
        patient::Entity::find()
            .order_by_asc(patient::Column::Name)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_patients", e))
    }

    pub async fn get(&self, id: &str) -> Result<patient::Model, ApiError> {
        patient::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("get_patient", e))?
            .ok_or_else(|| ApiError::not_found("Patient not found"))
    }

    /// Create a patient, enforcing national-id uniqueness
    pub async fn create(&self, input: CreatePatientInput) -> Result<patient::Model, ApiError> {
        if input.name.trim().is_empty() || input.national_id.trim().is_empty() {
            return Err(ApiError::validation_fields(
                "Validation failed",
                vec!["name and national_id are required".to_string()],
            ));
        }

        let duplicate = patient::Entity::find()
            .filter(patient::Column::NationalId.eq(&input.national_id))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("check_patient_national_id", e))?;
        if duplicate.is_some() {
            return Err(ApiError::conflict(
                "A patient with that national id already exists",
            ));
        }

        let row = patient::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(input.name),
            national_id: Set(input.national_id),
            birth_date: Set(input.birth_date),
            gender: Set(input.gender),
            phone: Set(input.phone),
            email: Set(input.email),
            address: Set(input.address),
            blood_type: Set(input.blood_type),
            allergies: Set(input.allergies),
            emergency_contact: Set(input.emergency_contact),
            active: Set(true),
            created_at: Set(Utc::now().timestamp()),
        };

        row.insert(&self.db)
            .await
            .map_err(|e| ApiError::from_db("create_patient", e))
    }

    /// Partial update; re-checks national-id uniqueness when it changes
    pub async fn update(
        &self,
        id: &str,
        input: UpdatePatientInput,
    ) -> Result<patient::Model, ApiError> {
        let existing = self.get(id).await?;

        if let Some(national_id) = &input.national_id {
            if national_id != &existing.national_id {
                let duplicate = patient::Entity::find()
                    .filter(patient::Column::NationalId.eq(national_id))
                    .filter(patient::Column::Id.ne(id))
                    .one(&self.db)
                    .await
                    .map_err(|e| ApiError::from_db("check_patient_national_id", e))?;
                if duplicate.is_some() {
                    return Err(ApiError::conflict(
                        "A patient with that national id already exists",
                    ));
                }
            }
        }

        let mut row = existing.into_active_model();
        if let Some(name) = input.name {
            row.name = Set(name);
        }
        if let Some(national_id) = input.national_id {
            row.national_id = Set(national_id);
        }
        if let Some(birth_date) = input.birth_date {
            row.birth_date = Set(Some(birth_date));
        }
        if let Some(gender) = input.gender {
            row.gender = Set(Some(gender));
        }
        if let Some(phone) = input.phone {
            row.phone = Set(Some(phone));
        }
        if let Some(email) = input.email {
            row.email = Set(Some(email));
        }
        if let Some(address) = input.address {
            row.address = Set(Some(address));
        }
        if let Some(blood_type) = input.blood_type {
            row.blood_type = Set(Some(blood_type));
        }
        if let Some(allergies) = input.allergies {
            row.allergies = Set(Some(allergies));
        }
        if let Some(emergency_contact) = input.emergency_contact {
            row.emergency_contact = Set(Some(emergency_contact));
        }
        if let Some(active) = input.active {
            row.active = Set(active);
        }

        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("update_patient", e))
    }

    /// Hard delete.
    ///
    /// Dependent appointments and medical records go with the patient;
    /// invoices are kept and unlinked, preserving the name snapshot.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.get(id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::from_db("begin_delete_patient", e))?;

        invoice::Entity::update_many()
            .col_expr(invoice::Column::PatientId, sea_orm::sea_query::Expr::value(Option::<String>::None))
            .filter(invoice::Column::PatientId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::from_db("unlink_patient_invoices", e))?;

        appointment::Entity::delete_many()
            .filter(appointment::Column::PatientId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::from_db("delete_patient_appointments", e))?;

        medical_record::Entity::delete_many()
            .filter(medical_record::Column::PatientId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| ApiError::from_db("delete_patient_records", e))?;

        patient::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| ApiError::from_db("delete_patient", e))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::from_db("commit_delete_patient", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_store() -> (DatabaseConnection, PatientStore) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        (db.clone(), PatientStore::new(db))
    }

    fn input(name: &str, national_id: &str) -> CreatePatientInput {
        CreatePatientInput {
            name: name.to_string(),
            national_id: national_id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_and_get_patient() {
        let (_db, store) = setup_store().await;
        let created = store.create(input("Ana López", "12345678")).await.unwrap();
        assert!(created.active);

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched.name, "Ana López");
        assert_eq!(fetched.national_id, "12345678");
    }

    #[tokio::test]
    async fn create_rejects_duplicate_national_id() {
        let (_db, store) = setup_store().await;
        store.create(input("Ana", "12345678")).await.unwrap();

        let err = store.create(input("Otra", "12345678")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_requires_name_and_national_id() {
        let (_db, store) = setup_store().await;
        let err = store.create(input("", "123")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn update_applies_only_supplied_fields() {
        let (_db, store) = setup_store().await;
        let created = store.create(input("Ana", "12345678")).await.unwrap();

        let updated = store
            .update(
                &created.id,
                UpdatePatientInput {
                    phone: Some("555-0101".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.phone.as_deref(), Some("555-0101"));
        assert_eq!(updated.name, "Ana");
        assert_eq!(updated.national_id, "12345678");
    }

    #[tokio::test]
    async fn update_rejects_national_id_collision() {
        let (_db, store) = setup_store().await;
        store.create(input("Ana", "111")).await.unwrap();
        let other = store.create(input("Luis", "222")).await.unwrap();

        let err = store
            .update(
                &other.id,
                UpdatePatientInput {
                    national_id: Some("111".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_missing_patient_is_not_found() {
        let (_db, store) = setup_store().await;
        let err = store.delete("nope").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_patient() {
        let (_db, store) = setup_store().await;
        let created = store.create(input("Ana", "12345678")).await.unwrap();
        store.delete(&created.id).await.unwrap();
        assert!(store.get(&created.id).await.is_err());
    }
}
