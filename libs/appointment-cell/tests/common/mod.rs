// libs/appointment-cell/tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentStatus, NewAppointment,
    NotificationEvent, Service,
};
use appointment_cell::services::{
    AppointmentLifecycleService, AppointmentStore, FixedClock, Notifier, RecordType,
};
use shared_config::SchedulingConfig;

/// Store that keeps rows in memory and joins services by id.
#[derive(Default)]
pub struct InMemoryStore {
    appointments: Mutex<Vec<Appointment>>,
    services: Mutex<HashMap<Uuid, Service>>,
    records: Mutex<HashSet<(Uuid, RecordType)>>,
    pub fail_creates: AtomicBool,
    /// Status another request writes just before our next guarded write lands.
    pub concurrent_status: Mutex<Option<AppointmentStatus>>,
}

impl InMemoryStore {
    pub fn add_service(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.services.lock().unwrap().insert(id, Service {
            id,
            name: name.to_string(),
            description: None,
            price: Some(500.0),
            duration_minutes: Some(30),
        });
        id
    }

    pub fn add_record(&self, appointment_id: Uuid, record_type: RecordType) {
        self.records.lock().unwrap().insert((appointment_id, record_type));
    }

    pub fn seed(&self, data: NewAppointment) -> Appointment {
        let appointment = self.materialize(data);
        self.appointments.lock().unwrap().push(appointment.clone());
        appointment
    }

    pub fn all(&self) -> Vec<Appointment> {
        self.appointments.lock().unwrap().clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Appointment> {
        self.all().into_iter().find(|a| a.id == id)
    }

    fn apply_concurrent_change(&self, id: Uuid) {
        if let Some(status) = self.concurrent_status.lock().unwrap().take() {
            if let Some(row) = self.appointments.lock().unwrap().iter_mut().find(|a| a.id == id) {
                row.status = status;
            }
        }
    }

    fn materialize(&self, data: NewAppointment) -> Appointment {
        let service = self.services.lock().unwrap().get(&data.service_id).cloned();
        Appointment {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            pet_id: data.pet_id,
            service_id: data.service_id,
            date: data.date,
            time: data.time,
            status: data.status,
            notes: data.notes,
            service,
            created_at: Some(Utc::now()),
        }
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let mut rows: Vec<Appointment> = self.all().into_iter().filter(|a| filter.matches(a)).collect();
        rows.sort_by_key(|a| a.local_instant());
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |limit| limit.max(0) as usize);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn create_appointment(&self, data: NewAppointment) -> Result<Appointment, AppointmentError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppointmentError::DatabaseError("insert rejected".to_string()));
        }
        Ok(self.seed(data))
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError> {
        self.apply_concurrent_change(id);
        let mut rows = self.appointments.lock().unwrap();
        Ok(rows.iter_mut().find(|a| a.id == id && a.status == from).map(|row| {
            row.status = to;
            row.clone()
        }))
    }

    async fn delete_appointment(&self, id: Uuid, expected: AppointmentStatus) -> Result<bool, AppointmentError> {
        self.apply_concurrent_change(id);
        let mut rows = self.appointments.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| !(a.id == id && a.status == expected));
        Ok(rows.len() < before)
    }

    async fn find_booked_times(&self, date: NaiveDate) -> Result<Vec<NaiveTime>, AppointmentError> {
        Ok(self.all().into_iter().filter(|a| a.date == date).map(|a| a.time).collect())
    }

    async fn record_exists(&self, appointment_id: Uuid, record_type: RecordType) -> Result<bool, AppointmentError> {
        Ok(self.records.lock().unwrap().contains(&(appointment_id, record_type)))
    }
}

/// Keeps every event it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(NotificationEvent, Uuid)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(NotificationEvent, Uuid)> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationEvent> {
        self.events().into_iter().map(|(event, _)| event).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: NotificationEvent, appointment: &Appointment) -> Result<()> {
        self.events.lock().unwrap().push((event, appointment.id));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: Arc<AppointmentLifecycleService>,
}

/// Clinic clock pinned to Saturday 2026-10-17 10:00 Manila time.
pub fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let now = Utc.with_ymd_and_hms(2026, 10, 17, 2, 0, 0).unwrap();
    let service = Arc::new(AppointmentLifecycleService::with_collaborators(
        SchedulingConfig::default(),
        store.clone(),
        notifier.clone(),
        Arc::new(FixedClock(now)),
    ));
    Harness { store, notifier, service }
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

pub fn next_sunday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

pub fn next_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn booking(service_id: Uuid, date: NaiveDate, time: NaiveTime, status: AppointmentStatus) -> NewAppointment {
    NewAppointment {
        user_id: Uuid::new_v4(),
        pet_id: Uuid::new_v4(),
        service_id,
        date,
        time,
        status,
        notes: None,
    }
}
