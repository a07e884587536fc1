use poem_openapi::{payload::Json, ApiResponse, Object};

use crate::stores::appointment_store::AppointmentView;
use crate::types::internal::domain::AppointmentStatus;

/// Appointment as presented to clients, with denormalized names
#[derive(Object, Debug, Clone)]
pub struct AppointmentData {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub date: String,
    pub time: String,
    pub reason: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: i64,
}

impl From<AppointmentView> for AppointmentData {
    fn from(view: AppointmentView) -> Self {
        Self {
            id: view.appointment.id,
            patient_id: view.appointment.patient_id,
            patient_name: view.patient_name,
            doctor_id: view.appointment.doctor_id,
            doctor_name: view.doctor_name,
            date: view.appointment.date,
            time: view.appointment.time,
            reason: view.appointment.reason,
            status: view.appointment.status,
            notes: view.appointment.notes,
            created_at: view.appointment.created_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct CreateAppointmentRequest {
    pub patient_id: String,
    pub doctor_id: String,
    /// "YYYY-MM-DD"
    pub date: String,
    /// "HH:MM"
    pub time: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Object, Debug)]
pub struct UpdateAppointmentRequest {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub reason: Option<String>,
    /// "scheduled", "in_progress", "completed" or "cancelled"
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Counts grouped by status, computed in memory over the caller's scoped list
#[derive(Object, Debug)]
pub struct AppointmentStatsData {
    pub total: i64,
    pub scheduled: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
}

impl AppointmentStatsData {
    pub fn from_views(views: &[AppointmentView]) -> Self {
        let mut stats = Self {
            total: views.len() as i64,
            scheduled: 0,
            in_progress: 0,
            completed: 0,
            cancelled: 0,
        };
        for view in views {
            match AppointmentStatus::parse(&view.appointment.status) {
                Some(AppointmentStatus::Scheduled) => stats.scheduled += 1,
                Some(AppointmentStatus::InProgress) => stats.in_progress += 1,
                Some(AppointmentStatus::Completed) => stats.completed += 1,
                Some(AppointmentStatus::Cancelled) => stats.cancelled += 1,
                None => {}
            }
        }
        stats
    }
}

#[derive(Object, Debug)]
pub struct AppointmentEnvelope {
    pub success: bool,
    pub message: String,
    pub data: AppointmentData,
}

impl AppointmentEnvelope {
    pub fn ok(message: impl Into<String>, data: AppointmentData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Object, Debug)]
pub struct AppointmentListEnvelope {
    pub success: bool,
    pub message: String,
    pub data: Vec<AppointmentData>,
}

impl AppointmentListEnvelope {
    pub fn ok(message: impl Into<String>, data: Vec<AppointmentData>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Object, Debug)]
pub struct AppointmentStatsEnvelope {
    pub success: bool,
    pub message: String,
    pub data: AppointmentStatsData,
}

impl AppointmentStatsEnvelope {
    pub fn ok(message: impl Into<String>, data: AppointmentStatsData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, ApiResponse)]
pub enum AppointmentCreatedResponse {
    #[oai(status = 201)]
    Created(Json<AppointmentEnvelope>),
}
