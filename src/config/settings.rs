use std::env;
use std::fmt;

/// Typed application settings loaded from the environment.
///
/// Constructed once in `main` and passed down explicitly; nothing in the
/// crate reads environment variables after startup.
#[derive(Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub reset_token_secret: String,

    pub cors_allowed_origins: Vec<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: u32,

    pub default_admin_email: String,
    pub default_admin_password: String,
    pub default_admin_name: String,

    pub mail_from: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Missing required environment variable: {0}")]
    MissingVariable(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, SettingsError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| SettingsError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}

impl Settings {
    /// Load settings from environment variables
    ///
    /// `JWT_SECRET` is the only required variable; everything else carries a
    /// development default. `RESET_TOKEN_SECRET` falls back to the JWT secret
    /// when unset.
    pub fn from_env() -> Result<Self, SettingsError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://clinic.db?mode=rwc".to_string());

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| SettingsError::MissingVariable("JWT_SECRET"))?;
        let reset_token_secret =
            env::var("RESET_TOKEN_SECRET").unwrap_or_else(|_| jwt_secret.clone());

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            database_url,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 3000)?,
            jwt_secret,
            jwt_expiration_hours: parsed("JWT_EXPIRATION_HOURS", 8)?,
            reset_token_secret,
            cors_allowed_origins,
            rate_limit_window_secs: parsed("RATE_LIMIT_WINDOW_SECS", 60)?,
            rate_limit_max_requests: parsed("RATE_LIMIT_MAX_REQUESTS", 100)?,
            default_admin_email: env::var("DEFAULT_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@clinic.local".to_string()),
            default_admin_password: env::var("DEFAULT_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
            default_admin_name: env::var("DEFAULT_ADMIN_NAME")
                .unwrap_or_else(|_| "Administrator".to_string()),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@clinic.local".to_string()),
        })
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("database_url", &self.database_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("reset_token_secret", &"<redacted>")
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("default_admin_email", &self.default_admin_email)
            .field("default_admin_password", &"<redacted>")
            .field("default_admin_name", &self.default_admin_name)
            .field("mail_from", &self.mail_from)
            .finish()
    }
}

#[cfg(test)]
impl Settings {
    /// Settings suitable for in-memory test databases
    pub(crate) fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "test-secret-key-minimum-32-characters-long".to_string(),
            jwt_expiration_hours: 8,
            reset_token_secret: "test-reset-secret-minimum-32-chars".to_string(),
            cors_allowed_origins: vec![],
            rate_limit_window_secs: 60,
            rate_limit_max_requests: 100,
            default_admin_email: "admin@clinic.local".to_string(),
            default_admin_password: "admin123".to_string(),
            default_admin_name: "Administrator".to_string(),
            mail_from: "noreply@clinic.local".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secrets() {
        let settings = Settings::for_tests();
        let output = format!("{:?}", settings);
        assert!(output.contains("<redacted>"));
        assert!(!output.contains("test-secret-key"));
        assert!(!output.contains("admin123"));
    }
}
