use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Settings;
use crate::services::{AuditLogger, Mailer, TokenService};
use crate::stores::{
    AppointmentStore, AuditStore, ClinicConfigStore, DoctorStore, InvoiceStore, MedicalRecordStore,
    PatientStore, UserStore,
};

/// Explicitly constructed application state.
///
/// Built once in `main` (or per test) and handed to each API; there are no
/// module-level singletons, so every test run gets an isolated store.
pub struct AppData {
    pub settings: Arc<Settings>,
    pub users: Arc<UserStore>,
    pub patients: Arc<PatientStore>,
    pub doctors: Arc<DoctorStore>,
    pub appointments: Arc<AppointmentStore>,
    pub invoices: Arc<InvoiceStore>,
    pub medical_records: Arc<MedicalRecordStore>,
    pub clinic_config: Arc<ClinicConfigStore>,
    pub audit_store: Arc<AuditStore>,
    pub audit: Arc<AuditLogger>,
    pub tokens: Arc<TokenService>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppData {
    pub fn new(db: DatabaseConnection, settings: Settings, mailer: Arc<dyn Mailer>) -> Self {
        let audit_store = Arc::new(AuditStore::new(db.clone()));
        let tokens = Arc::new(TokenService::new(
            settings.jwt_secret.clone(),
            settings.jwt_expiration_hours,
        ));

        Self {
            settings: Arc::new(settings),
            users: Arc::new(UserStore::new(db.clone())),
            patients: Arc::new(PatientStore::new(db.clone())),
            doctors: Arc::new(DoctorStore::new(db.clone())),
            appointments: Arc::new(AppointmentStore::new(db.clone())),
            invoices: Arc::new(InvoiceStore::new(db.clone())),
            medical_records: Arc::new(MedicalRecordStore::new(db.clone())),
            clinic_config: Arc::new(ClinicConfigStore::new(db)),
            audit: Arc::new(AuditLogger::new(Arc::clone(&audit_store))),
            audit_store,
            tokens,
            mailer,
        }
    }
}
