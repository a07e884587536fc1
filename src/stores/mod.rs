// Store layer - one repository per entity over the database connection
pub mod appointment_store;
pub mod audit_store;
pub mod clinic_config_store;
pub mod doctor_store;
pub mod invoice_store;
pub mod medical_record_store;
pub mod patient_store;
pub mod user_store;

pub use appointment_store::AppointmentStore;
pub use audit_store::AuditStore;
pub use clinic_config_store::ClinicConfigStore;
pub use doctor_store::DoctorStore;
pub use invoice_store::InvoiceStore;
pub use medical_record_store::MedicalRecordStore;
pub use patient_store::PatientStore;
pub use user_store::UserStore;
