pub use sea_orm_migration::prelude::*;

mod m20250310_000001_create_clinic_schema;
mod m20250310_000002_create_audit_schema;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250310_000001_create_clinic_schema::Migration),
            Box::new(m20250310_000002_create_audit_schema::Migration),
        ]
    }
}
