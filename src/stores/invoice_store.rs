use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::types::db::{invoice, patient};
use crate::types::internal::domain::InvoiceStatus;

#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    pub patient_id: String,
    pub concept: String,
    pub amount: Decimal,
    pub date: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateInvoiceInput {
    pub concept: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<String>,
    pub status: Option<String>,
}

/// Repository for invoices.
///
/// The patient link is nullable: invoices keep their name snapshot and
/// survive patient deletion.
pub struct InvoiceStore {
    db: DatabaseConnection,
}

impl InvoiceStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<invoice::Model>, ApiError> {
        invoice::Entity::find()
            .order_by_desc(invoice::Column::Date)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_invoices", e))
    }

    pub async fn get(&self, id: &str) -> Result<invoice::Model, ApiError> {
        invoice::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("get_invoice", e))?
            .ok_or_else(|| ApiError::not_found("Invoice not found"))
    }

    pub async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<invoice::Model>, ApiError> {
        invoice::Entity::find()
            .filter(invoice::Column::PatientId.eq(patient_id))
            .order_by_desc(invoice::Column::Date)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_invoices_by_patient", e))
    }

    pub async fn list_by_status(&self, status: &str) -> Result<Vec<invoice::Model>, ApiError> {
        if InvoiceStatus::parse(status).is_none() {
            return Err(ApiError::validation_fields(
                "Validation failed",
                vec![format!("unknown invoice status: {status}")],
            ));
        }
        invoice::Entity::find()
            .filter(invoice::Column::Status.eq(status))
            .order_by_desc(invoice::Column::Date)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_invoices_by_status", e))
    }

    /// Create an invoice for an existing patient, snapshotting their name
    pub async fn create(&self, input: CreateInvoiceInput) -> Result<invoice::Model, ApiError> {
        let mut issues = Vec::new();
        if input.concept.trim().is_empty() {
            issues.push("concept is required".to_string());
        }
        if input.amount < Decimal::ZERO {
            issues.push("amount must not be negative".to_string());
        }
        if NaiveDate::parse_from_str(&input.date, "%Y-%m-%d").is_err() {
            issues.push("date must be YYYY-MM-DD".to_string());
        }
        let status = input
            .status
            .unwrap_or_else(|| InvoiceStatus::Pending.as_str().to_string());
        if InvoiceStatus::parse(&status).is_none() {
            issues.push(format!("unknown invoice status: {status}"));
        }
        if !issues.is_empty() {
            return Err(ApiError::validation_fields("Validation failed", issues));
        }

        let patient = patient::Entity::find_by_id(&input.patient_id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("check_invoice_patient", e))?
            .ok_or_else(|| ApiError::not_found("Patient not found"))?;

        let row = invoice::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            patient_id: Set(Some(patient.id)),
            patient_name: Set(patient.name),
            concept: Set(input.concept),
            amount: Set(input.amount),
            date: Set(input.date),
            status: Set(status),
            created_at: Set(Utc::now().timestamp()),
        };

        row.insert(&self.db)
            .await
            .map_err(|e| ApiError::from_db("create_invoice", e))
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdateInvoiceInput,
    ) -> Result<invoice::Model, ApiError> {
        if let Some(status) = &input.status {
            if InvoiceStatus::parse(status).is_none() {
                return Err(ApiError::validation_fields(
                    "Validation failed",
                    vec![format!("unknown invoice status: {status}")],
                ));
            }
        }
        if let Some(date) = &input.date {
            if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                return Err(ApiError::validation_fields(
                    "Validation failed",
                    vec!["date must be YYYY-MM-DD".to_string()],
                ));
            }
        }

        let existing = self.get(id).await?;
        let mut row = existing.into_active_model();
        if let Some(concept) = input.concept {
            row.concept = Set(concept);
        }
        if let Some(amount) = input.amount {
            row.amount = Set(amount);
        }
        if let Some(date) = input.date {
            row.date = Set(date);
        }
        if let Some(status) = input.status {
            row.status = Set(status);
        }

        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("update_invoice", e))
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.get(id).await?;
        invoice::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| ApiError::from_db("delete_invoice", e))?;
        Ok(())
    }
}
