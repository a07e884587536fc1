use poem_openapi::{payload::Json, Object, OpenApi, Tags};

/// Health check API
pub struct HealthApi;

#[derive(Tags)]
enum HealthTags {
    /// Service health endpoints
    Health,
}

#[derive(Object, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[OpenApi]
impl HealthApi {
    /// Liveness probe
    #[oai(path = "/health", method = "get", tag = "HealthTags::Health")]
    pub async fn health(&self) -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
