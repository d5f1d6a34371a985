// libs/appointment-cell/src/services/status.rs
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, NotificationEvent, StatusBucket,
};
use crate::services::records::RecordType;

/// What the record rule says about a pending `scheduled -> completed` move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRequirement {
    NotRequired,
    Satisfied,
    Missing(RecordType),
}

impl RecordRequirement {
    pub fn evaluate(required: RecordType, exists: bool) -> Self {
        match (required.is_required(), exists) {
            (false, _) => RecordRequirement::NotRequired,
            (true, true) => RecordRequirement::Satisfied,
            (true, false) => RecordRequirement::Missing(required),
        }
    }
}

/// Legal status moves. There is no cancelled state; cancelling deletes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentStateMachine;

impl AppointmentStateMachine {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions(&self, current: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current {
            AppointmentStatus::Pending => &[AppointmentStatus::Scheduled],
            AppointmentStatus::Scheduled => &[AppointmentStatus::Completed, AppointmentStatus::Missed],
            AppointmentStatus::Completed => &[AppointmentStatus::Scheduled],
            AppointmentStatus::Missed => &[AppointmentStatus::Scheduled],
        }
    }

    pub fn is_allowed(&self, from: AppointmentStatus, to: AppointmentStatus) -> bool {
        self.valid_transitions(from).contains(&to)
    }

    /// Checks only the table. Call before touching the store for records.
    pub fn validate_transition(
        &self,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", from, to);

        if !self.is_allowed(from, to) {
            warn!("Invalid status transition attempted: {} -> {}", from, to);
            return Err(AppointmentError::InvalidStatusTransition { from, to });
        }

        Ok(())
    }

    /// Applies the record rule to a move that already passed the table.
    pub fn validate_completion(&self, requirement: RecordRequirement) -> Result<(), AppointmentError> {
        match requirement {
            RecordRequirement::Missing(record_type) => {
                warn!("Completion blocked: {} record missing", record_type);
                Err(AppointmentError::RecordRequired { record_type })
            }
            RecordRequirement::NotRequired | RecordRequirement::Satisfied => Ok(()),
        }
    }

    /// Appointments are deleted, never cancelled by status. Completed visits
    /// are medical history and stay.
    pub fn can_delete(&self, status: AppointmentStatus) -> bool {
        !matches!(status, AppointmentStatus::Completed)
    }

    pub fn notification_for(&self, from: AppointmentStatus, to: AppointmentStatus) -> NotificationEvent {
        match (from, to) {
            (AppointmentStatus::Pending, AppointmentStatus::Scheduled) => NotificationEvent::Confirmed,
            (_, AppointmentStatus::Completed) => NotificationEvent::Completed,
            (_, AppointmentStatus::Missed) => NotificationEvent::Missed,
            _ => NotificationEvent::StatusChanged,
        }
    }
}

impl StatusBucket {
    /// Stored statuses the store must return for this bucket.
    pub fn stored_statuses(&self) -> Vec<AppointmentStatus> {
        match self {
            StatusBucket::Pending => vec![AppointmentStatus::Pending],
            StatusBucket::Scheduled => vec![AppointmentStatus::Scheduled],
            StatusBucket::Completed => vec![AppointmentStatus::Completed],
            StatusBucket::Missed => vec![AppointmentStatus::Missed, AppointmentStatus::Scheduled],
        }
    }

    /// Read-time classification. A `scheduled` row whose instant is before
    /// `now` lists as missed, not scheduled; its stored status is untouched.
    pub fn contains(&self, appointment: &Appointment, now: NaiveDateTime) -> bool {
        let overdue = appointment.local_instant() < now;
        match (self, appointment.status) {
            (StatusBucket::Pending, AppointmentStatus::Pending) => true,
            (StatusBucket::Completed, AppointmentStatus::Completed) => true,
            (StatusBucket::Scheduled, AppointmentStatus::Scheduled) => !overdue,
            (StatusBucket::Missed, AppointmentStatus::Missed) => true,
            (StatusBucket::Missed, AppointmentStatus::Scheduled) => overdue,
            _ => false,
        }
    }
}
