use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::types::db::{appointment, doctor, patient};
use crate::types::internal::domain::AppointmentStatus;

#[derive(Debug, Clone, Default)]
pub struct CreateAppointmentInput {
    pub patient_id: String,
    pub doctor_id: String,
    pub date: String,
    pub time: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Partial update; only supplied fields change
#[derive(Debug, Clone, Default)]
pub struct UpdateAppointmentInput {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub reason: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Appointment row plus denormalized counterpart names for display
#[derive(Debug, Clone)]
pub struct AppointmentView {
    pub appointment: appointment::Model,
    pub patient_name: String,
    pub doctor_name: String,
}

/// Repository for appointments.
///
/// Owns the one non-trivial invariant in the system: for a given
/// (doctor, date, time) at most one non-cancelled appointment may exist.
/// The slot check and the write run inside a single transaction.
pub struct AppointmentStore {
    db: DatabaseConnection,
}

impl AppointmentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn validate_slot_format(date: &str, time: &str) -> Result<(), ApiError> {
        let mut issues = Vec::new();
        if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            issues.push("date must be YYYY-MM-DD".to_string());
        }
        if NaiveTime::parse_from_str(time, "%H:%M").is_err() {
            issues.push("time must be HH:MM".to_string());
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_fields("Validation failed", issues))
        }
    }

    /// The conflict query: any non-cancelled appointment already holding the
    /// doctor/date/time slot, optionally excluding one id (for updates).
    async fn find_conflict<C: ConnectionTrait>(
        conn: &C,
        doctor_id: &str,
        date: &str,
        time: &str,
        exclude_id: Option<&str>,
    ) -> Result<Option<appointment::Model>, ApiError> {
        let mut query = appointment::Entity::find()
            .filter(appointment::Column::DoctorId.eq(doctor_id))
            .filter(appointment::Column::Date.eq(date))
            .filter(appointment::Column::Time.eq(time))
            .filter(appointment::Column::Status.ne(AppointmentStatus::Cancelled.as_str()));
        if let Some(id) = exclude_id {
            query = query.filter(appointment::Column::Id.ne(id));
        }
        query
            .one(conn)
            .await
            .map_err(|e| ApiError::from_db("find_appointment_conflict", e))
    }

    /// Book a slot.
    ///
    /// Fails with 404 when the referenced patient or doctor does not exist
    /// and with 409 when a non-cancelled appointment already occupies the
    /// doctor/date/time slot.
    pub async fn create(
        &self,
        input: CreateAppointmentInput,
    ) -> Result<appointment::Model, ApiError> {
        Self::validate_slot_format(&input.date, &input.time)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::from_db("begin_create_appointment", e))?;

        patient::Entity::find_by_id(&input.patient_id)
            .one(&txn)
            .await
            .map_err(|e| ApiError::from_db("check_appointment_patient", e))?
            .ok_or_else(|| ApiError::not_found("Patient not found"))?;

        doctor::Entity::find_by_id(&input.doctor_id)
            .one(&txn)
            .await
            .map_err(|e| ApiError::from_db("check_appointment_doctor", e))?
            .ok_or_else(|| ApiError::not_found("Doctor not found"))?;

        if Self::find_conflict(&txn, &input.doctor_id, &input.date, &input.time, None)
            .await?
            .is_some()
        {
            return Err(ApiError::conflict(
                "The doctor already has an appointment at that date and time",
            ));
        }

        let row = appointment::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            patient_id: Set(input.patient_id),
            doctor_id: Set(input.doctor_id),
            date: Set(input.date),
            time: Set(input.time),
            reason: Set(input.reason),
            status: Set(AppointmentStatus::Scheduled.as_str().to_string()),
            notes: Set(input.notes),
            created_at: Set(Utc::now().timestamp()),
        };

        let created = row
            .insert(&txn)
            .await
            .map_err(|e| ApiError::from_db("create_appointment", e))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::from_db("commit_create_appointment", e))?;

        Ok(created)
    }

    /// Partial update.
    ///
    /// Moving the appointment (new doctor, date or time) re-runs the slot
    /// check, excluding the record's own id.
    pub async fn update(
        &self,
        id: &str,
        input: UpdateAppointmentInput,
    ) -> Result<appointment::Model, ApiError> {
        if let Some(status) = &input.status {
            if AppointmentStatus::parse(status).is_none() {
                return Err(ApiError::validation_fields(
                    "Validation failed",
                    vec![format!("unknown appointment status: {status}")],
                ));
            }
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::from_db("begin_update_appointment", e))?;

        let existing = appointment::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(|e| ApiError::from_db("get_appointment", e))?
            .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

        if let Some(patient_id) = &input.patient_id {
            if patient_id != &existing.patient_id {
                patient::Entity::find_by_id(patient_id)
                    .one(&txn)
                    .await
                    .map_err(|e| ApiError::from_db("check_appointment_patient", e))?
                    .ok_or_else(|| ApiError::not_found("Patient not found"))?;
            }
        }
        if let Some(doctor_id) = &input.doctor_id {
            if doctor_id != &existing.doctor_id {
                doctor::Entity::find_by_id(doctor_id)
                    .one(&txn)
                    .await
                    .map_err(|e| ApiError::from_db("check_appointment_doctor", e))?
                    .ok_or_else(|| ApiError::not_found("Doctor not found"))?;
            }
        }

        let doctor_id = input.doctor_id.as_deref().unwrap_or(&existing.doctor_id);
        let date = input.date.as_deref().unwrap_or(&existing.date);
        let time = input.time.as_deref().unwrap_or(&existing.time);
        Self::validate_slot_format(date, time)?;

        let slot_moved = doctor_id != existing.doctor_id
            || date != existing.date
            || time != existing.time;
        if slot_moved
            && Self::find_conflict(&txn, doctor_id, date, time, Some(id))
                .await?
                .is_some()
        {
            return Err(ApiError::conflict(
                "The doctor already has an appointment at that date and time",
            ));
        }

        let mut row = existing.into_active_model();
        if let Some(patient_id) = input.patient_id {
            row.patient_id = Set(patient_id);
        }
        if let Some(doctor_id) = input.doctor_id {
            row.doctor_id = Set(doctor_id);
        }
        if let Some(date) = input.date {
            row.date = Set(date);
        }
        if let Some(time) = input.time {
            row.time = Set(time);
        }
        if let Some(reason) = input.reason {
            row.reason = Set(Some(reason));
        }
        if let Some(status) = input.status {
            row.status = Set(status);
        }
        if let Some(notes) = input.notes {
            row.notes = Set(Some(notes));
        }

        let updated = row
            .update(&txn)
            .await
            .map_err(|e| ApiError::from_db("update_appointment", e))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::from_db("commit_update_appointment", e))?;

        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        appointment::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("get_appointment", e))?
            .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

        appointment::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| ApiError::from_db("delete_appointment", e))?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<appointment::Model, ApiError> {
        appointment::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("get_appointment", e))?
            .ok_or_else(|| ApiError::not_found("Appointment not found"))
    }

    /// Single appointment with display names attached
    pub async fn view(&self, id: &str) -> Result<AppointmentView, ApiError> {
        let row = self.get(id).await?;
        let mut views = self.attach_names(vec![row]).await?;
        Ok(views.remove(0))
    }

    pub async fn list(&self) -> Result<Vec<AppointmentView>, ApiError> {
        let rows = appointment::Entity::find()
            .order_by_asc(appointment::Column::Date)
            .order_by_asc(appointment::Column::Time)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_appointments", e))?;
        self.attach_names(rows).await
    }

    pub async fn list_by_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<AppointmentView>, ApiError> {
        let rows = appointment::Entity::find()
            .filter(appointment::Column::PatientId.eq(patient_id))
            .order_by_asc(appointment::Column::Date)
            .order_by_asc(appointment::Column::Time)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_appointments_by_patient", e))?;
        self.attach_names(rows).await
    }

    pub async fn list_by_doctor(&self, doctor_id: &str) -> Result<Vec<AppointmentView>, ApiError> {
        let rows = appointment::Entity::find()
            .filter(appointment::Column::DoctorId.eq(doctor_id))
            .order_by_asc(appointment::Column::Date)
            .order_by_asc(appointment::Column::Time)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_appointments_by_doctor", e))?;
        self.attach_names(rows).await
    }

    pub async fn list_by_date(&self, date: &str) -> Result<Vec<AppointmentView>, ApiError> {
        let rows = appointment::Entity::find()
            .filter(appointment::Column::Date.eq(date))
            .order_by_asc(appointment::Column::Time)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_appointments_by_date", e))?;
        self.attach_names(rows).await
    }

    /// Resolve display names for a batch of appointments with two id-set
    /// lookups instead of a join per row.
    async fn attach_names(
        &self,
        rows: Vec<appointment::Model>,
    ) -> Result<Vec<AppointmentView>, ApiError> {
        let patient_ids: Vec<String> = rows.iter().map(|a| a.patient_id.clone()).collect();
        let doctor_ids: Vec<String> = rows.iter().map(|a| a.doctor_id.clone()).collect();

        let patients: HashMap<String, String> = patient::Entity::find()
            .filter(patient::Column::Id.is_in(patient_ids))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("resolve_patient_names", e))?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let doctors: HashMap<String, String> = doctor::Entity::find()
            .filter(doctor::Column::Id.is_in(doctor_ids))
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("resolve_doctor_names", e))?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();

        Ok(rows
            .into_iter()
            .map(|appointment| {
                let patient_name = patients
                    .get(&appointment.patient_id)
                    .cloned()
                    .unwrap_or_default();
                let doctor_name = doctors
                    .get(&appointment.doctor_id)
                    .cloned()
                    .unwrap_or_default();
                AppointmentView {
                    appointment,
                    patient_name,
                    doctor_name,
                }
            })
            .collect())
    }
}
