use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create doctors table first: users and appointments reference it
        manager
            .create_table(
                Table::create()
                    .table(Doctors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Doctors::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Doctors::Name).string().not_null())
                    .col(ColumnDef::new(Doctors::Specialty).string().not_null())
                    .col(
                        ColumnDef::new(Doctors::LicenseNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Doctors::Phone).string().null())
                    .col(ColumnDef::new(Doctors::Email).string().null())
                    .col(
                        ColumnDef::new(Doctors::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Doctors::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Patients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Patients::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Patients::Name).string().not_null())
                    .col(
                        ColumnDef::new(Patients::NationalId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Patients::BirthDate).string().null())
                    .col(ColumnDef::new(Patients::Gender).string().null())
                    .col(ColumnDef::new(Patients::Phone).string().null())
                    .col(ColumnDef::new(Patients::Email).string().null())
                    .col(ColumnDef::new(Patients::Address).string().null())
                    .col(ColumnDef::new(Patients::BloodType).string().null())
                    .col(ColumnDef::new(Patients::Allergies).string().null())
                    .col(ColumnDef::new(Patients::EmergencyContact).string().null())
                    .col(
                        ColumnDef::new(Patients::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Patients::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string().null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(
                        ColumnDef::new(Users::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Users::RejectionReason).string().null())
                    .col(ColumnDef::new(Users::Phone).string().null())
                    .col(ColumnDef::new(Users::Specialty).string().null())
                    .col(ColumnDef::new(Users::LicenseNumber).string().null())
                    .col(ColumnDef::new(Users::DoctorId).string().null())
                    .col(ColumnDef::new(Users::PatientId).string().null())
                    .col(ColumnDef::new(Users::ResetTokenHash).string().null())
                    .col(
                        ColumnDef::new(Users::ResetTokenExpiresAt)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Users::LastLoginAt).big_integer().null())
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_doctor_id")
                            .from(Users::Table, Users::DoctorId)
                            .to(Doctors::Table, Doctors::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_patient_id")
                            .from(Users::Table, Users::PatientId)
                            .to(Patients::Table, Patients::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Appointments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Appointments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Appointments::PatientId).string().not_null())
                    .col(ColumnDef::new(Appointments::DoctorId).string().not_null())
                    .col(ColumnDef::new(Appointments::Date).string().not_null())
                    .col(ColumnDef::new(Appointments::Time).string().not_null())
                    .col(ColumnDef::new(Appointments::Reason).string().null())
                    .col(
                        ColumnDef::new(Appointments::Status)
                            .string()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(ColumnDef::new(Appointments::Notes).string().null())
                    .col(
                        ColumnDef::new(Appointments::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointments_patient_id")
                            .from(Appointments::Table, Appointments::PatientId)
                            .to(Patients::Table, Patients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointments_doctor_id")
                            .from(Appointments::Table, Appointments::DoctorId)
                            .to(Doctors::Table, Doctors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Backs the double-booking slot lookup
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_appointments_slot")
                    .table(Appointments::Table)
                    .col(Appointments::DoctorId)
                    .col(Appointments::Date)
                    .col(Appointments::Time)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_appointments_patient")
                    .table(Appointments::Table)
                    .col(Appointments::PatientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invoices::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invoices::PatientId).string().null())
                    .col(ColumnDef::new(Invoices::PatientName).string().not_null())
                    .col(ColumnDef::new(Invoices::Concept).string().not_null())
                    .col(
                        ColumnDef::new(Invoices::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::Date).string().not_null())
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Invoices::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_patient_id")
                            .from(Invoices::Table, Invoices::PatientId)
                            .to(Patients::Table, Patients::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MedicalRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MedicalRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MedicalRecords::PatientId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MedicalRecords::DoctorId).string().not_null())
                    .col(ColumnDef::new(MedicalRecords::Date).string().not_null())
                    .col(ColumnDef::new(MedicalRecords::Diagnosis).string().not_null())
                    .col(ColumnDef::new(MedicalRecords::Treatment).string().null())
                    .col(ColumnDef::new(MedicalRecords::Prescription).string().null())
                    .col(
                        ColumnDef::new(MedicalRecords::Attachments)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(MedicalRecords::Notes).string().null())
                    .col(
                        ColumnDef::new(MedicalRecords::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_medical_records_patient_id")
                            .from(MedicalRecords::Table, MedicalRecords::PatientId)
                            .to(Patients::Table, Patients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_medical_records_doctor_id")
                            .from(MedicalRecords::Table, MedicalRecords::DoctorId)
                            .to(Doctors::Table, Doctors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_medical_records_patient")
                    .table(MedicalRecords::Table)
                    .col(MedicalRecords::PatientId)
                    .to_owned(),
            )
            .await?;

        // Singleton clinic configuration, lazily populated on first read
        manager
            .create_table(
                Table::create()
                    .table(ClinicConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClinicConfig::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClinicConfig::Name).string().not_null())
                    .col(ColumnDef::new(ClinicConfig::Address).string().not_null())
                    .col(ColumnDef::new(ClinicConfig::Phone).string().not_null())
                    .col(ColumnDef::new(ClinicConfig::Email).string().not_null())
                    .col(ColumnDef::new(ClinicConfig::BusinessHours).string().not_null())
                    .col(ColumnDef::new(ClinicConfig::Currency).string().not_null())
                    .col(ColumnDef::new(ClinicConfig::Logo).text().null())
                    .col(
                        ColumnDef::new(ClinicConfig::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClinicConfig::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MedicalRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Appointments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Patients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Doctors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Username,
    PasswordHash,
    Name,
    Role,
    Status,
    RejectionReason,
    Phone,
    Specialty,
    LicenseNumber,
    DoctorId,
    PatientId,
    ResetTokenHash,
    ResetTokenExpiresAt,
    LastLoginAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Doctors {
    Table,
    Id,
    Name,
    Specialty,
    LicenseNumber,
    Phone,
    Email,
    Active,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Patients {
    Table,
    Id,
    Name,
    NationalId,
    BirthDate,
    Gender,
    Phone,
    Email,
    Address,
    BloodType,
    Allergies,
    EmergencyContact,
    Active,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Appointments {
    Table,
    Id,
    PatientId,
    DoctorId,
    Date,
    Time,
    Reason,
    Status,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    PatientId,
    PatientName,
    Concept,
    Amount,
    Date,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MedicalRecords {
    Table,
    Id,
    PatientId,
    DoctorId,
    Date,
    Diagnosis,
    Treatment,
    Prescription,
    Attachments,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ClinicConfig {
    Table,
    Id,
    Name,
    Address,
    Phone,
    Email,
    BusinessHours,
    Currency,
    Logo,
    UpdatedAt,
}
