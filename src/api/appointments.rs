use poem_openapi::{param::Path, payload::Json, OpenApi, Tags};
use std::sync::Arc;

use crate::api::{authenticate, require_staff, BearerAuth};
use crate::app_data::AppData;
use crate::errors::ApiError;
use crate::services::{AuditLogger, TokenService};
use crate::stores::appointment_store::{
    AppointmentView, CreateAppointmentInput, UpdateAppointmentInput,
};
use crate::stores::{AppointmentStore, UserStore};
use crate::types::dto::appointments::{
    AppointmentCreatedResponse, AppointmentEnvelope, AppointmentListEnvelope,
    AppointmentStatsData, AppointmentStatsEnvelope, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::types::dto::common::MessageEnvelope;
use crate::types::internal::scope::AccessScope;

/// Appointment API.
///
/// Every read path re-derives the same scoping rule from the principal's
/// access scope: staff see everything, a doctor sees their own schedule, a
/// patient sees their own bookings. Caller-supplied filters are never
/// trusted to narrow visibility.
pub struct AppointmentsApi {
    appointments: Arc<AppointmentStore>,
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
    audit: Arc<AuditLogger>,
}

impl AppointmentsApi {
    pub fn new(data: &AppData) -> Self {
        Self {
            appointments: Arc::clone(&data.appointments),
            users: Arc::clone(&data.users),
            tokens: Arc::clone(&data.tokens),
            audit: Arc::clone(&data.audit),
        }
    }

    fn scope_filter(views: Vec<AppointmentView>, scope: &AccessScope) -> Vec<AppointmentView> {
        views
            .into_iter()
            .filter(|v| {
                scope.can_view_appointment(&v.appointment.doctor_id, &v.appointment.patient_id)
            })
            .collect()
    }

    /// The scoped base listing shared by list() and stats()
    async fn scoped_list(&self, scope: &AccessScope) -> Result<Vec<AppointmentView>, ApiError> {
        match scope {
            AccessScope::Admin | AccessScope::Receptionist => self.appointments.list().await,
            AccessScope::Doctor { doctor_id } => self.appointments.list_by_doctor(doctor_id).await,
            AccessScope::Patient { patient_id } => {
                self.appointments.list_by_patient(patient_id).await
            }
        }
    }
}

#[derive(Tags)]
enum AppointmentTags {
    /// Appointment scheduling endpoints
    Appointments,
}

#[OpenApi]
impl AppointmentsApi {
    /// List appointments visible to the caller
    #[oai(path = "/citas", method = "get", tag = "AppointmentTags::Appointments")]
    pub async fn list(&self, auth: BearerAuth) -> Result<Json<AppointmentListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        let views = self.scoped_list(&principal.scope()).await?;

        Ok(Json(AppointmentListEnvelope::ok(
            "Appointments retrieved",
            views.into_iter().map(Into::into).collect(),
        )))
    }

    /// Status counts over the caller's visible appointments
    #[oai(
        path = "/citas/estadisticas",
        method = "get",
        tag = "AppointmentTags::Appointments"
    )]
    pub async fn stats(&self, auth: BearerAuth) -> Result<Json<AppointmentStatsEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        let views = self.scoped_list(&principal.scope()).await?;

        Ok(Json(AppointmentStatsEnvelope::ok(
            "Statistics computed",
            AppointmentStatsData::from_views(&views),
        )))
    }

    /// Appointments on a calendar date, scope-filtered
    #[oai(
        path = "/citas/fecha/:fecha",
        method = "get",
        tag = "AppointmentTags::Appointments"
    )]
    pub async fn list_by_date(
        &self,
        auth: BearerAuth,
        fecha: Path<String>,
    ) -> Result<Json<AppointmentListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        let scope = principal.scope();

        let views = self.appointments.list_by_date(&fecha.0).await?;
        let views = Self::scope_filter(views, &scope);

        Ok(Json(AppointmentListEnvelope::ok(
            "Appointments retrieved",
            views.into_iter().map(Into::into).collect(),
        )))
    }

    /// Appointments of one patient
    ///
    /// A patient may only ask for their own id; a doctor gets the subset
    /// they attend.
    #[oai(
        path = "/citas/paciente/:paciente_id",
        method = "get",
        tag = "AppointmentTags::Appointments"
    )]
    pub async fn list_by_patient(
        &self,
        auth: BearerAuth,
        paciente_id: Path<String>,
    ) -> Result<Json<AppointmentListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        let scope = principal.scope();

        if let AccessScope::Patient { patient_id } = &scope {
            if patient_id != &paciente_id.0 {
                return Err(ApiError::forbidden(
                    "You may only view your own appointments",
                ));
            }
        }

        let views = self.appointments.list_by_patient(&paciente_id.0).await?;
        let views = Self::scope_filter(views, &scope);

        Ok(Json(AppointmentListEnvelope::ok(
            "Appointments retrieved",
            views.into_iter().map(Into::into).collect(),
        )))
    }

    /// Appointments of one doctor
    ///
    /// A doctor may only ask for their own id; a patient gets the subset
    /// that is theirs.
    #[oai(
        path = "/citas/medico/:medico_id",
        method = "get",
        tag = "AppointmentTags::Appointments"
    )]
    pub async fn list_by_doctor(
        &self,
        auth: BearerAuth,
        medico_id: Path<String>,
    ) -> Result<Json<AppointmentListEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        let scope = principal.scope();

        if let AccessScope::Doctor { doctor_id } = &scope {
            if doctor_id != &medico_id.0 {
                return Err(ApiError::forbidden(
                    "You may only view your own appointments",
                ));
            }
        }

        let views = self.appointments.list_by_doctor(&medico_id.0).await?;
        let views = Self::scope_filter(views, &scope);

        Ok(Json(AppointmentListEnvelope::ok(
            "Appointments retrieved",
            views.into_iter().map(Into::into).collect(),
        )))
    }

    /// Fetch a single appointment
    ///
    /// Out-of-scope access is denied with 403; existence is not hidden.
    #[oai(path = "/citas/:id", method = "get", tag = "AppointmentTags::Appointments")]
    pub async fn get(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<AppointmentEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;

        let view = self.appointments.view(&id.0).await?;
        if !principal
            .scope()
            .can_view_appointment(&view.appointment.doctor_id, &view.appointment.patient_id)
        {
            return Err(ApiError::forbidden(
                "You do not have access to this appointment",
            ));
        }

        Ok(Json(AppointmentEnvelope::ok(
            "Appointment retrieved",
            view.into(),
        )))
    }

    /// Book an appointment (admin and receptionist)
    #[oai(path = "/citas", method = "post", tag = "AppointmentTags::Appointments")]
    pub async fn create(
        &self,
        auth: BearerAuth,
        body: Json<CreateAppointmentRequest>,
    ) -> Result<AppointmentCreatedResponse, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_staff(&principal)?;

        let created = self
            .appointments
            .create(CreateAppointmentInput {
                patient_id: body.patient_id.clone(),
                doctor_id: body.doctor_id.clone(),
                date: body.date.clone(),
                time: body.time.clone(),
                reason: body.reason.clone(),
                notes: body.notes.clone(),
            })
            .await?;

        self.audit.log(
            &principal,
            "CREATE",
            "Cita",
            format!(
                "booked appointment {} on {} {}",
                created.id, created.date, created.time
            ),
        );

        let view = self.appointments.view(&created.id).await?;
        Ok(AppointmentCreatedResponse::Created(Json(
            AppointmentEnvelope::ok("Appointment created", view.into()),
        )))
    }

    /// Update an appointment
    ///
    /// Staff may change any field. A doctor may only touch the status of
    /// their own appointments; every other submitted field is dropped.
    /// Patients have no write access.
    #[oai(path = "/citas/:id", method = "put", tag = "AppointmentTags::Appointments")]
    pub async fn update(
        &self,
        auth: BearerAuth,
        id: Path<String>,
        body: Json<UpdateAppointmentRequest>,
    ) -> Result<Json<AppointmentEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;

        let input = match principal.scope() {
            AccessScope::Admin | AccessScope::Receptionist => UpdateAppointmentInput {
                patient_id: body.patient_id.clone(),
                doctor_id: body.doctor_id.clone(),
                date: body.date.clone(),
                time: body.time.clone(),
                reason: body.reason.clone(),
                status: body.status.clone(),
                notes: body.notes.clone(),
            },
            AccessScope::Doctor { doctor_id } => {
                let existing = self.appointments.get(&id.0).await?;
                if existing.doctor_id != doctor_id {
                    return Err(ApiError::forbidden(
                        "You do not have access to this appointment",
                    ));
                }
                UpdateAppointmentInput {
                    status: body.status.clone(),
                    ..Default::default()
                }
            }
            AccessScope::Patient { .. } => {
                return Err(ApiError::forbidden(
                    "Patients cannot modify appointments",
                ));
            }
        };

        let updated = self.appointments.update(&id.0, input).await?;

        self.audit.log(
            &principal,
            "UPDATE",
            "Cita",
            format!("updated appointment {}", updated.id),
        );

        let view = self.appointments.view(&updated.id).await?;
        Ok(Json(AppointmentEnvelope::ok(
            "Appointment updated",
            view.into(),
        )))
    }

    /// Delete an appointment (admin and receptionist)
    #[oai(path = "/citas/:id", method = "delete", tag = "AppointmentTags::Appointments")]
    pub async fn delete(
        &self,
        auth: BearerAuth,
        id: Path<String>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let principal = authenticate(&self.users, &self.tokens, &auth.0).await?;
        require_staff(&principal)?;

        self.appointments.delete(&id.0).await?;

        self.audit.log(
            &principal,
            "DELETE",
            "Cita",
            format!("deleted appointment {}", id.0),
        );

        Ok(Json(MessageEnvelope::ok("Appointment deleted")))
    }
}
