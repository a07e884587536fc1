// Error types shared across the API surface
pub mod api;

pub use api::{ApiError, ErrorBody};
