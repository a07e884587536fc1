use poem_openapi::{payload::Json, ApiResponse, Object};

use crate::types::db::invoice;

/// Invoice as presented to clients.
///
/// Amounts travel as decimal strings ("150.00") and are parsed into a
/// fixed-point type at the boundary; floats never touch money.
#[derive(Object, Debug, Clone)]
pub struct InvoiceData {
    pub id: String,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub concept: String,
    pub amount: String,
    pub date: String,
    pub status: String,
    pub created_at: i64,
}

impl From<invoice::Model> for InvoiceData {
    fn from(model: invoice::Model) -> Self {
        Self {
            id: model.id,
            patient_id: model.patient_id,
            patient_name: model.patient_name,
            concept: model.concept,
            amount: model.amount.to_string(),
            date: model.date,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct CreateInvoiceRequest {
    pub patient_id: String,
    pub concept: String,
    /// Decimal string, e.g. "150.00"
    pub amount: String,
    /// "YYYY-MM-DD"
    pub date: String,
    /// "pending", "paid" or "voided"; defaults to "pending"
    pub status: Option<String>,
}

#[derive(Object, Debug)]
pub struct UpdateInvoiceRequest {
    pub concept: Option<String>,
    pub amount: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

#[derive(Object, Debug)]
pub struct InvoiceEnvelope {
    pub success: bool,
    pub message: String,
    pub data: InvoiceData,
}

impl InvoiceEnvelope {
    pub fn ok(message: impl Into<String>, data: InvoiceData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Object, Debug)]
pub struct InvoiceListEnvelope {
    pub success: bool,
    pub message: String,
    pub data: Vec<InvoiceData>,
}

impl InvoiceListEnvelope {
    pub fn ok(message: impl Into<String>, data: Vec<InvoiceData>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, ApiResponse)]
pub enum InvoiceCreatedResponse {
    #[oai(status = 201)]
    Created(Json<InvoiceEnvelope>),
}
