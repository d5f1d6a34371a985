// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::services::records::RecordType;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked visit. `date` and `time` are stored separately but always read
/// together as one clinic-local instant, see [`Appointment::local_instant`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(with = "time_of_day")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// Embedded by the store (`service:services(*)`).
    #[serde(default)]
    pub service: Option<Service>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Date and time combined, truncated to the minute. Both halves are
    /// clinic-local wall clock values.
    pub fn local_instant(&self) -> NaiveDateTime {
        self.date.and_time(truncate_to_minute(self.time))
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service.as_ref().map(|service| service.name.as_str())
    }

    pub fn required_record(&self) -> RecordType {
        self.service_name()
            .map(RecordType::for_service)
            .unwrap_or(RecordType::None)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Completed,
    Missed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Missed => write!(f, "missed"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "missed" => Ok(AppointmentStatus::Missed),
            other => Err(AppointmentError::ValidationError(format!("Unknown status: {}", other))),
        }
    }
}

/// Catalog entry. Read-only for scheduling; only `name` drives record rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
}

/// Who is booking. Decides the initial status and which guards apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOrigin {
    /// Pet owner booking through the portal.
    SelfService,
    /// Clinic staff booking on the owner's behalf.
    Operator,
}

impl BookingOrigin {
    pub fn initial_status(&self) -> AppointmentStatus {
        match self {
            BookingOrigin::SelfService => AppointmentStatus::Pending,
            BookingOrigin::Operator => AppointmentStatus::Scheduled,
        }
    }
}

/// Insert payload handed to the store.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewAppointment {
    pub user_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(with = "time_of_day")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

/// Store-side query. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub id: Option<Uuid>,
    pub statuses: Vec<AppointmentStatus>,
    pub user_id: Option<Uuid>,
    pub pet_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    /// Restricts `scheduled` rows, and only those, to dates on or before this one.
    pub scheduled_until: Option<NaiveDate>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl AppointmentFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.id.map_or(true, |id| appointment.id == id)
            && (self.statuses.is_empty() || self.statuses.contains(&appointment.status))
            && self.user_id.map_or(true, |id| appointment.user_id == id)
            && self.pet_id.map_or(true, |id| appointment.pet_id == id)
            && self.date.map_or(true, |date| appointment.date == date)
            && self.date_from.map_or(true, |date| appointment.date >= date)
            && match (self.scheduled_until, appointment.status) {
                (Some(until), AppointmentStatus::Scheduled) => appointment.date <= until,
                _ => true,
            }
    }
}

/// Events handed to the notification collaborator (email).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    Created,
    StatusChanged,
    Cancelled,
    Missed,
    Confirmed,
    Completed,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Booking form. Every field is optional on the wire so missing values can be
/// reported together as one validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub user_id: Option<Uuid>,
    pub pet_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    #[serde(default, with = "calendar_date::option")]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "time_of_day::option")]
    pub time: Option<NaiveTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionStatusRequest {
    pub status: AppointmentStatus,
}

/// Raised by the record-creation collaborator after a health record,
/// vaccination, or deworming has been saved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordCreatedEvent {
    pub record_type: RecordType,
    pub record_id: Option<Uuid>,
    /// The appointment the record was written for, if any.
    pub appointment_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub pet_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub next_due_date: Option<NaiveDate>,
}

/// Result of the follow-up cascade. A failed cascade is reported here and
/// never turned into an error for the record that triggered it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CascadeOutcome {
    pub follow_up: Option<Appointment>,
    pub cascade_error: Option<String>,
}

impl CascadeOutcome {
    pub fn triggered(&self) -> bool {
        self.follow_up.is_some() || self.cascade_error.is_some()
    }
}

/// One bookable slot with its availability for a given date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotAvailability {
    #[serde(with = "time_of_day")]
    pub time: NaiveTime,
    pub is_booked: bool,
    pub is_past: bool,
    pub available: bool,
}

/// Listing buckets. `Missed` also holds `scheduled` rows whose instant has
/// already passed; that reclassification happens at read time only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusBucket {
    Pending,
    Scheduled,
    Completed,
    Missed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentListQuery {
    pub status: StatusBucket,
    pub user_id: Option<Uuid>,
    pub pet_id: Option<Uuid>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

/// A listed appointment with its advisory annotations.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub has_conflict: bool,
    pub required_record: RecordType,
    /// Only checked for rows that still need a record before completion.
    pub record_exists: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    /// The booking form sends `date=` before a day is picked.
    #[serde(default, with = "calendar_date::option")]
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{time} on {date} is not a bookable slot")]
    OffGrid { date: NaiveDate, time: NaiveTime },

    #[error("Appointment slot not available")]
    SlotNotAvailable,

    #[error("Cannot change status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("A {record_type} record is required before completing this appointment")]
    RecordRequired { record_type: RecordType },

    #[error("Appointments with status {0} cannot be cancelled")]
    DeletionNotAllowed(AppointmentStatus),

    #[error("Appointment status changed from {expected} to {actual} before the update was applied")]
    StatusChanged {
        expected: AppointmentStatus,
        actual: AppointmentStatus,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Follow-up scheduling failed: {0}")]
    CascadeFailed(String),
}

impl AppointmentError {
    /// Failures a caller may simply retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppointmentError::DatabaseError(_) | AppointmentError::Timeout(_))
    }
}

// ==============================================================================
// DATE / TIME WIRE FORMATS
// ==============================================================================

pub(crate) fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Parses a time-of-day from `HH:MM`, `HH:MM:SS[.f]`, or a full timestamp
/// whose date part is a sentinel. For timestamps the written wall-clock time
/// is kept as-is; no zone conversion is applied.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.contains('T') {
        if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
            return Some(stamp.time());
        }
        return NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|stamp| stamp.time());
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Parses a calendar date from `YYYY-MM-DD` or the date part of a timestamp.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub mod time_of_day {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid time of day: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => crate::models::parse_time_of_day(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid time of day: {}", raw))),
                None => Ok(None),
            }
        }
    }
}

pub mod calendar_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_calendar_date(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw)))
    }

    /// Blank strings read as `None`.
    pub mod option {
        use chrono::NaiveDate;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => crate::models::parse_calendar_date(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw))),
                None => Ok(None),
            }
        }
    }
}
