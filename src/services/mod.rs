// Service layer - crypto, tokens, audit, mail
pub mod audit_logger;
pub mod crypto;
pub mod mailer;
pub mod token_service;

pub use audit_logger::AuditLogger;
pub use mailer::{LogMailer, MailError, Mailer};
pub use token_service::TokenService;
