// Environment-driven configuration and logging setup
pub mod logging;
pub mod settings;

pub use logging::init_logging;
pub use settings::{Settings, SettingsError};
