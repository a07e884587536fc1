use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use crate::api::{authenticate, require_admin, require_staff, BearerAuth};
use crate::app_data::AppData;
use crate::errors::ApiError;
use crate::services::{AuditLogger, TokenService};
use crate::stores::invoice_store::{CreateInvoiceInput, UpdateInvoiceInput};
use crate::stores::{InvoiceStore, UserStore};
use crate::types::dto::common::MessageEnvelope;
use crate::types::dto::invoices::{
    CreateInvoiceRequest, InvoiceCreatedResponse, InvoiceEnvelope, InvoiceListEnvelope,
    UpdateInvoiceRequest,
};

/// Invoice management API (admin and receptionist)
pub struct InvoicesApi {
    invoices: Arc<InvoiceStore>,
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
    audit: Arc<AuditLogger>,
}

impl InvoicesApi {
    pub fn new(data: &AppData) -> Self {
        Self {
            invoices: Arc::clone(&data.invoices),
            users: Arc::clone(&data.users),
            tokens: Arc::clone(&data.tokens),
            audit: Arc::clone(&data.audit),
        }
    }

    fn parse_amount(raw: &str) -> Result<Decimal, ApiError> {
        Decimal::from_str(raw).map_err(|_| {
            ApiError::validation_fields(
                "Validation failed",
                vec![format!("amount is not a valid decimal: {raw}")],
            )
        })
    }
}

#[derive(Tags)]
enum InvoiceTags {
    /// Billing endpoints
    Invoices,
}

#[OpenApi]
impl InvoicesApi {
    /// List all invoices
    #[oai(path = "/facturas", method = "get", tag = "InvoiceTags::Invoices")]
    pub async fn list(&self, auth: BearerAuth) -> Result<Json<InvoiceListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_staff(&principal)?;

        let invoices = self.invoices.list().await?;
        Ok(Json(InvoiceListEnvelope::ok(
            "Invoices retrieved",
            invoices.into_iter().map(Into::into).collect(),
        )))
    }

    /// Invoices of one patient
    #[oai(
        path = "/facturas/paciente/:paciente_id",
        method = "get",
        tag = "InvoiceTags::Invoices"
    )]
    pub async fn list_by_patient(
        &self,
        auth: BearerAuth,
        paciente_id: Path<String>,
    ) -> Result<Json<InvoiceListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_staff(&principal)?;

        let invoices = self.invoices.list_by_patient(&paciente_id.0).await?;
        Ok(Json(InvoiceListEnvelope::ok(
            "Invoices retrieved",
            invoices.into_iter().map(Into::into).collect(),
        )))
    }

    /// Fetch a single invoice
    #[oai(path = "/facturas/:id", method = "get", tag = "InvoiceTags::Invoices")]
    pub async fn get(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<InvoiceEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_staff(&principal)?;

        let invoice = self.invoices.get(&id.0).await?;
        Ok(Json(InvoiceEnvelope::ok("Invoice retrieved", invoice.into())))
    }

    /// Create an invoice
    #[oai(path = "/facturas", method = "post", tag = "InvoiceTags::Invoices")]
    pub async fn create(
        &self,
        auth: BearerAuth,
        body: Json<CreateInvoiceRequest>,
    ) -> Result<InvoiceCreatedResponse, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_staff(&principal)?;

        let amount = Self::parse_amount(&body.amount)?;
        let created = self
            .invoices
            .create(CreateInvoiceInput {
                patient_id: body.patient_id.clone(),
                concept: body.concept.clone(),
                amount,
                date: body.date.clone(),
                status: body.status.clone(),
            })
            .await?;

        self.audit.log(
            &principal,
            "CREATE",
            "Factura",
            format!("created invoice {} for {}", created.id, created.patient_name),
        );

        Ok(InvoiceCreatedResponse::Created(Json(InvoiceEnvelope::ok(
            "Invoice created",
            created.into(),
        ))))
    }

    /// Update an invoice
    #[oai(path = "/facturas/:id", method = "put", tag = "InvoiceTags::Invoices")]
    pub async fn update(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        body: Json<UpdateInvoiceRequest>,
    ) -> Result<Json<InvoiceEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_staff(&principal)?;

        let amount = match &body.amount {
            Some(raw) => Some(Self::parse_amount(raw)?),
            None => None,
        };

        let updated = self
            .invoices
            .update(
                &id.0,
                UpdateInvoiceInput {
                    concept: body.concept.clone(),
                    amount,
                    date: body.date.clone(),
                    status: body.status.clone(),
                },
            )
            .await?;

        self.audit.log(
            &principal,
            "UPDATE",
            "Factura",
            format!("updated invoice {}", updated.id),
        );

        Ok(Json(InvoiceEnvelope::ok("Invoice updated", updated.into())))
    }

    /// Delete an invoice (admin only)
    #[oai(path = "/facturas/:id", method = "delete", tag = "InvoiceTags::Invoices")]
    pub async fn delete(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_admin(&principal)?;

        self.invoices.delete(&id.0).await?;

        self.audit.log(
            &principal,
            "DELETE",
            "Factura",
            format!("deleted invoice {}", id.0),
        );

        Ok(Json(MessageEnvelope::ok("Invoice deleted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::services::LogMailer;
    use crate::stores::patient_store::CreatePatientInput;
    use crate::stores::user_store::CreateUserInput;
    use crate::types::internal::scope::{Role, UserStatus};
    use migration::{Migrator, MigratorTrait};
    use poem_openapi::auth::Bearer;
    use sea_orm::Database;

    async fn setup() -> (AppData, InvoicesApi, String) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        let data = AppData::new(
            db,
            Settings::for_tests(),
            Arc::new(LogMailer::new("test@clinic.local".to_string())),
        );
        let patient_id = data
            .patients
            .create(CreatePatientInput {
                name: "Ana López".to_string(),
                national_id: "12345678".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id;
        let api = InvoicesApi::new(&data);
        (data, api, patient_id)
    }

    async fn token_for(data: &AppData, email: &str, role: Role) -> BearerAuth {
        let user = data
            .users
            .create(
                CreateUserInput {
                    email: email.to_string(),
                    username: None,
                    password: "secret123".to_string(),
                    name: format!("User {email}"),
                    role,
                    phone: None,
                    specialty: None,
                    license_number: None,
                    national_id: if role == Role::Patient {
                        Some(format!("NID-{email}"))
                    } else {
                        None
                    },
                    birth_date: None,
                    gender: None,
                    address: None,
                },
                UserStatus::Active,
            )
            .await
            .unwrap();
        BearerAuth(Bearer {
            token: data.tokens.issue(&user).unwrap(),
        })
    }

    fn create_request(patient_id: &str, amount: &str) -> Json<CreateInvoiceRequest> {
        Json(CreateInvoiceRequest {
            patient_id: patient_id.to_string(),
            concept: "Consultation".to_string(),
            amount: amount.to_string(),
            date: "2025-01-10".to_string(),
            status: None,
        })
    }

    #[tokio::test]
    async fn receptionist_creates_invoice_with_decimal_amount() {
        let (data, api, patient_id) = setup().await;
        let auth = token_for(&data, "front@clinic.local", Role::Receptionist).await;

        let InvoiceCreatedResponse::Created(body) = api
            .create(auth, create_request(&patient_id, "150.00"))
            .await
            .unwrap();
        // Scale may differ across backends; compare values, not strings
        assert_eq!(
            Decimal::from_str(&body.0.data.amount).unwrap(),
            Decimal::from_str("150.00").unwrap()
        );
        assert_eq!(body.0.data.status, "pending");
    }

    #[tokio::test]
    async fn malformed_amount_is_validation_error() {
        let (data, api, patient_id) = setup().await;
        let auth = token_for(&data, "front@clinic.local", Role::Receptionist).await;

        let err = api
            .create(auth, create_request(&patient_id, "12,34eur"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn doctor_cannot_access_invoices() {
        let (data, api, _patient_id) = setup().await;
        let auth = token_for(&data, "doc@clinic.local", Role::Doctor).await;

        let err = api.list(auth).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn delete_requires_admin() {
        let (data, api, patient_id) = setup().await;
        let auth = token_for(&data, "front@clinic.local", Role::Receptionist).await;
        let InvoiceCreatedResponse::Created(body) = api
            .create(auth, create_request(&patient_id, "10.00"))
            .await
            .unwrap();
        let invoice_id = body.0.data.id.clone();

        let auth = token_for(&data, "front2@clinic.local", Role::Receptionist).await;
        assert!(matches!(
            api.delete(auth, Path(invoice_id.clone())).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));

        let admin = token_for(&data, "admin@clinic.local", Role::Admin).await;
        assert!(api.delete(admin, Path(invoice_id)).await.is_ok());
    }
}
