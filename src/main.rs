mod api;
mod app_data;
mod config;
mod errors;
mod services;
mod stores;
mod types;

use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use poem::{listener::TcpListener, middleware::Cors, EndpointExt, Route, Server};
use poem_openapi::OpenApiService;
use sea_orm::Database;

use api::{
    AppointmentsApi, AuditApi, AuthApi, ClinicConfigApi, DoctorsApi, HealthApi, InvoicesApi,
    MedicalRecordsApi, PatientsApi, UsersApi,
};
use app_data::AppData;
use config::Settings;
use services::LogMailer;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    config::init_logging().expect("Failed to initialize logging");

    let settings = Settings::from_env().expect("Failed to load settings");

    let db = Database::connect(&settings.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!(url = %settings.database_url, "connected to database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("database migrations completed");

    let mailer = Arc::new(LogMailer::new(settings.mail_from.clone()));
    let bind_addr = format!("{}:{}", settings.host, settings.port);
    let cors_origins = settings.cors_allowed_origins.clone();

    let data = AppData::new(db, settings, mailer);

    // Keep the one-active-admin invariant from the very first request
    match data
        .users
        .seed_default_admin(
            &data.settings.default_admin_email,
            &data.settings.default_admin_password,
            &data.settings.default_admin_name,
        )
        .await
    {
        Ok(Some(admin)) => tracing::info!(email = %admin.email, "seeded default admin account"),
        Ok(None) => tracing::debug!("active admin present, skipping seed"),
        Err(err) => panic!("Failed to seed default admin: {err}"),
    }

    let api_service = OpenApiService::new(
        (
            HealthApi,
            AuthApi::new(&data),
            PatientsApi::new(&data),
            DoctorsApi::new(&data),
            AppointmentsApi::new(&data),
            InvoicesApi::new(&data),
            MedicalRecordsApi::new(&data),
            ClinicConfigApi::new(&data),
            UsersApi::new(&data),
            AuditApi::new(&data),
        ),
        "Clinic Backend",
        env!("CARGO_PKG_VERSION"),
    )
    .server("http://localhost:3000/api");

    let ui = api_service.swagger_ui();

    // Default CORS mirrors any origin; an allow-list narrows it
    let cors = cors_origins
        .iter()
        .fold(Cors::new(), |cors, origin| cors.allow_origin(origin.as_str()));

    let app = Route::new()
        .nest("/api", api_service)
        .nest("/swagger", ui)
        .with(cors);

    tracing::info!(addr = %bind_addr, "starting server");
    Server::new(TcpListener::bind(bind_addr)).run(app).await
}
