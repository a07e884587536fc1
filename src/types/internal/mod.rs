// Internal (non-API) types shared across layers
pub mod auth;
pub mod domain;
pub mod scope;
