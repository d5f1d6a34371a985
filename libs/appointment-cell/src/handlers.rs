// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::models::{
    AppointmentError, AppointmentListQuery, BookingOrigin, CreateAppointmentRequest,
    RecordCreatedEvent, SlotQuery, TransitionStatusRequest,
};
use crate::services::lifecycle::{required_record_for, AppointmentLifecycleService};

pub type AppointmentState = Arc<AppointmentLifecycleService>;

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        let message = e.to_string();
        match e {
            AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::ValidationError(_) | AppointmentError::OffGrid { .. } => {
                AppError::ValidationError(message)
            }
            AppointmentError::SlotNotAvailable
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::DeletionNotAllowed(_)
            | AppointmentError::StatusChanged { .. } => AppError::Conflict(message),
            AppointmentError::RecordRequired { .. } => AppError::PreconditionRequired(message),
            AppointmentError::DatabaseError(_) => AppError::Database(message),
            AppointmentError::Timeout(_) => AppError::Timeout(message),
            AppointmentError::CascadeFailed(_) => AppError::Internal(message),
        }
    }
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

pub async fn get_available_slots(
    State(state): State<AppointmentState>,
    ValidQuery(query): ValidQuery<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state.available_slots(query.date).await?;
    let config = state.scheduling_config();

    Ok(Json(json!({
        "success": true,
        "date": query.date,
        "timezone": config.timezone_name,
        "slots": slots,
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// Pet owner booking. Lands as `pending` until the clinic confirms it.
pub async fn book_appointment(
    State(state): State<AppointmentState>,
    ValidJson(request): ValidJson<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.create_appointment(request, BookingOrigin::SelfService).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment requested - awaiting clinic confirmation"
    })))
}

/// Staff booking. Lands as `scheduled`.
pub async fn admin_book_appointment(
    State(state): State<AppointmentState>,
    ValidJson(request): ValidJson<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.create_appointment(request, BookingOrigin::Operator).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment scheduled"
    })))
}

// ==============================================================================
// APPOINTMENT MANAGEMENT HANDLERS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<AppointmentState>,
    ValidQuery(query): ValidQuery<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let bucket = query.status;
    let appointments = state.list_appointments(query).await?;
    let conflicts = appointments.iter().filter(|view| view.has_conflict).count();

    Ok(Json(json!({
        "success": true,
        "status": bucket,
        "total": appointments.len(),
        "conflicts": conflicts,
        "appointments": appointments,
    })))
}

pub async fn get_appointment(
    State(state): State<AppointmentState>,
    ValidPath(appointment_id): ValidPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.get_appointment(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "required_record": appointment.required_record(),
    })))
}

pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    ValidPath(appointment_id): ValidPath<Uuid>,
    ValidJson(request): ValidJson<TransitionStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.transition_status(appointment_id, request.status).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    ValidPath(appointment_id): ValidPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.delete_appointment(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

// ==============================================================================
// MEDICAL RECORD HANDLERS
// ==============================================================================

/// Called after a medical record is saved. The record itself is already
/// committed, so a failed follow-up still answers with success and carries
/// the cascade error alongside.
pub async fn record_created(
    State(state): State<AppointmentState>,
    ValidJson(event): ValidJson<RecordCreatedEvent>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.record_created(event).await?;

    Ok(Json(json!({
        "success": true,
        "follow_up": outcome.follow_up,
        "cascade_error": outcome.cascade_error,
    })))
}

pub async fn get_service_record_type(ValidPath(service_name): ValidPath<String>) -> Json<Value> {
    let record_type = required_record_for(&service_name);

    Json(json!({
        "success": true,
        "service": service_name,
        "record_type": record_type,
        "record_required": record_type.is_required(),
    }))
}
