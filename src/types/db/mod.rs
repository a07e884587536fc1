// Database entity definitions (SeaORM)
pub mod appointment;
pub mod audit_entry;
pub mod clinic_config;
pub mod doctor;
pub mod invoice;
pub mod medical_record;
pub mod patient;
pub mod user;
