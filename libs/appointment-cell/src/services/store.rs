// libs/appointment-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{
    time_of_day, Appointment, AppointmentError, AppointmentFilter, AppointmentStatus,
    NewAppointment,
};
use crate::services::records::RecordType;

/// Persistence for appointments. The lifecycle service is its only writer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError>;

    async fn create_appointment(&self, data: NewAppointment) -> Result<Appointment, AppointmentError>;

    /// Writes `to` only while the row still holds `from`. `None` when no row
    /// matched, either because it is gone or its status moved on.
    async fn update_appointment_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError>;

    /// Deletes only while the row still holds `expected`. `false` when no row matched.
    async fn delete_appointment(&self, id: Uuid, expected: AppointmentStatus) -> Result<bool, AppointmentError>;

    /// Times already taken on `date`, whatever their status.
    async fn find_booked_times(&self, date: NaiveDate) -> Result<Vec<NaiveTime>, AppointmentError>;

    async fn record_exists(
        &self,
        appointment_id: Uuid,
        record_type: RecordType,
    ) -> Result<bool, AppointmentError>;
}

const APPOINTMENT_SELECT: &str = "select=*,service:services(*)";

#[derive(Debug, Deserialize)]
struct BookedTimeRow {
    #[serde(with = "time_of_day")]
    time: NaiveTime,
}

/// [`AppointmentStore`] backed by Supabase's PostgREST API.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn build_query(filter: &AppointmentFilter) -> String {
        let mut query_parts = vec![APPOINTMENT_SELECT.to_string()];

        if let Some(id) = filter.id {
            query_parts.push(format!("id=eq.{}", id));
        }
        match (filter.statuses.as_slice(), filter.scheduled_until) {
            ([], _) => {}
            (statuses, Some(until)) if statuses.contains(&AppointmentStatus::Scheduled) => {
                let until = until.format("%Y-%m-%d");
                let branches = statuses
                    .iter()
                    .map(|status| match status {
                        AppointmentStatus::Scheduled => {
                            format!("and(status.eq.{},date.lte.{})", status, until)
                        }
                        other => format!("status.eq.{}", other),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                query_parts.push(format!("or=({})", branches));
            }
            ([status], _) => query_parts.push(format!("status=eq.{}", status)),
            (statuses, _) => {
                let list = statuses.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
                query_parts.push(format!("status=in.({})", list));
            }
        }
        if let Some(user_id) = filter.user_id {
            query_parts.push(format!("user_id=eq.{}", user_id));
        }
        if let Some(pet_id) = filter.pet_id {
            query_parts.push(format!("pet_id=eq.{}", pet_id));
        }
        if let Some(date) = filter.date {
            query_parts.push(format!("date=eq.{}", date.format("%Y-%m-%d")));
        }
        if let Some(date_from) = filter.date_from {
            query_parts.push(format!("date=gte.{}", date_from.format("%Y-%m-%d")));
        }

        query_parts.push("order=date.asc,time.asc".to_string());

        if let Some(limit) = filter.limit {
            query_parts.push(format!("limit={}", limit));
        }
        if let Some(offset) = filter.offset {
            query_parts.push(format!("offset={}", offset));
        }

        query_parts.join("&")
    }

    fn parse_appointments(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    fn first_row(rows: Vec<Value>) -> Result<Appointment, AppointmentError> {
        Self::parse_appointments(rows)?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?{}", Self::build_query(filter));
        debug!("Fetching appointments: {}", path);

        let result: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::parse_appointments(result)
    }

    async fn create_appointment(&self, data: NewAppointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(&data)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to encode appointment: {}", e)))?;
        let path = format!("/rest/v1/appointments?{}", APPOINTMENT_SELECT);

        let result: Vec<Value> = self.supabase
            .request_returning(Method::POST, &path, Some(body))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::first_row(result).map_err(|e| match e {
            AppointmentError::NotFound => {
                AppointmentError::DatabaseError("Insert returned no rows".to_string())
            }
            other => other,
        })
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}&{}",
            id, from, APPOINTMENT_SELECT
        );

        let result: Vec<Value> = self.supabase
            .request_returning(Method::PATCH, &path, Some(json!({ "status": to })))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(Self::parse_appointments(result)?.into_iter().next())
    }

    async fn delete_appointment(&self, id: Uuid, expected: AppointmentStatus) -> Result<bool, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&status=eq.{}", id, expected);

        let result: Vec<Value> = self.supabase
            .request_returning(Method::DELETE, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(!result.is_empty())
    }

    async fn find_booked_times(&self, date: NaiveDate) -> Result<Vec<NaiveTime>, AppointmentError> {
        let path = format!("/rest/v1/appointments?select=time&date=eq.{}", date.format("%Y-%m-%d"));

        let result: Vec<BookedTimeRow> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(result.into_iter().map(|row| row.time).collect())
    }

    async fn record_exists(
        &self,
        appointment_id: Uuid,
        record_type: RecordType,
    ) -> Result<bool, AppointmentError> {
        let Some(table) = record_type.table() else {
            return Ok(false);
        };
        let path = format!("/rest/v1/{}?select=id&appointment_id=eq.{}&limit=1", table, appointment_id);

        let result: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(!result.is_empty())
    }
}
