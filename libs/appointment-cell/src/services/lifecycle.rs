// libs/appointment-cell/src/services/lifecycle.rs
use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use futures::future::try_join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig};
use shared_database::supabase::SupabaseClient;

use crate::models::{
    truncate_to_minute, Appointment, AppointmentError, AppointmentFilter, AppointmentListQuery,
    AppointmentStatus, AppointmentView, BookingOrigin, CascadeOutcome, CreateAppointmentRequest,
    NewAppointment, NotificationEvent, RecordCreatedEvent, SlotAvailability, StatusBucket,
};
use crate::services::availability::SlotAvailabilityResolver;
use crate::services::calendar::BusinessHoursCalendar;
use crate::services::clock::{Clock, SystemClock};
use crate::services::conflict::ConflictDetector;
use crate::services::notification::{Notifier, TracingNotifier, WebhookNotifier};
use crate::services::records::RecordType;
use crate::services::status::{AppointmentStateMachine, RecordRequirement};
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

/// The only component that writes appointments. Stateless between calls:
/// every operation reads fresh from the store.
pub struct AppointmentLifecycleService {
    store: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    calendar: BusinessHoursCalendar,
    availability: SlotAvailabilityResolver,
    state_machine: AppointmentStateMachine,
    conflict_detector: ConflictDetector,
    config: SchedulingConfig,
}

impl AppointmentLifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let store: Arc<dyn AppointmentStore> = Arc::new(SupabaseAppointmentStore::new(supabase));
        let notifier: Arc<dyn Notifier> = match &config.notification_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url)),
            None => Arc::new(TracingNotifier),
        };

        Self::with_collaborators(config.scheduling.clone(), store, notifier, Arc::new(SystemClock))
    }

    pub fn with_collaborators(
        config: SchedulingConfig,
        store: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            calendar: BusinessHoursCalendar::new(&config),
            availability: SlotAvailabilityResolver::new(&config),
            state_machine: AppointmentStateMachine::new(),
            conflict_detector: ConflictDetector::new(&config),
            config,
        }
    }

    pub fn scheduling_config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Clinic-local wall clock now.
    pub fn local_now(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.config.utc_offset).naive_local()
    }

    // ==============================================================================
    // QUERIES
    // ==============================================================================

    /// Slots for `date` with booked/past annotations. No date, no lookup.
    pub async fn available_slots(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<SlotAvailability>, AppointmentError> {
        let Some(date) = date else {
            return Ok(Vec::new());
        };

        let slots = self.calendar.slots_for(Some(date));
        if slots.is_empty() {
            return Ok(Vec::new());
        }

        let booked = self.io("find booked times", self.store.find_booked_times(date)).await?;
        debug!("{} of {} slots booked on {}", booked.len(), slots.len(), date);

        Ok(self.availability.resolve(date, &slots, &booked, self.local_now()))
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", id);

        let filter = AppointmentFilter::by_id(id);
        let found = self.io("find appointment", self.store.find_appointments(&filter)).await?;
        found.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// One status bucket, annotated for the operator table.
    pub async fn list_appointments(
        &self,
        query: AppointmentListQuery,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        debug!("Listing {:?} appointments", query.status);

        let now = self.local_now();
        let filter = AppointmentFilter {
            statuses: query.status.stored_statuses(),
            user_id: query.user_id,
            pet_id: query.pet_id,
            date_from: (query.status == StatusBucket::Scheduled).then(|| now.date()),
            scheduled_until: (query.status == StatusBucket::Missed).then(|| now.date()),
            limit: query.limit,
            offset: query.offset,
            ..Default::default()
        };

        let batch: Vec<Appointment> = self
            .io("list appointments", self.store.find_appointments(&filter))
            .await?
            .into_iter()
            .filter(|appointment| query.status.contains(appointment, now))
            .collect();

        let conflicts = self.conflict_detector.flag_conflicts(&batch);

        let record_checks = batch.iter().map(|appointment| async move {
            let required = appointment.required_record();
            if appointment.status != AppointmentStatus::Scheduled || !required.is_required() {
                return Ok(None);
            }
            self.io("check record", self.store.record_exists(appointment.id, required))
                .await
                .map(Some)
        });
        let record_exists = try_join_all(record_checks).await?;

        Ok(batch
            .into_iter()
            .zip(conflicts)
            .zip(record_exists)
            .map(|((appointment, has_conflict), record_exists)| AppointmentView {
                required_record: appointment.required_record(),
                appointment,
                has_conflict,
                record_exists,
            })
            .collect())
    }

    // ==============================================================================
    // MUTATIONS
    // ==============================================================================

    /// Books an appointment. Self-service bookings start `pending` and may not
    /// take a past or already-booked slot; operator bookings start `scheduled`
    /// and may double-book (the conflict flags surface that).
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        origin: BookingOrigin,
    ) -> Result<Appointment, AppointmentError> {
        let data = self.validate_booking(request, origin)?;

        if origin == BookingOrigin::SelfService {
            if data.date.and_time(data.time) <= self.local_now() {
                return Err(AppointmentError::ValidationError(
                    "Appointment must be booked for a future time".to_string(),
                ));
            }

            let booked = self.io("find booked times", self.store.find_booked_times(data.date)).await?;
            if self.availability.is_booked(data.time, &booked) {
                warn!("Slot {} on {} already booked", data.time, data.date);
                return Err(AppointmentError::SlotNotAvailable);
            }
        }

        self.insert(data).await
    }

    /// Moves an appointment along the state machine. Nothing is written when
    /// the move is rejected.
    pub async fn transition_status(
        &self,
        id: Uuid,
        target: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(id).await?;
        self.state_machine.validate_transition(current.status, target)?;

        if target == AppointmentStatus::Completed {
            let required = current.required_record();
            let exists = if required.is_required() {
                self.io("check record", self.store.record_exists(id, required)).await?
            } else {
                false
            };
            self.state_machine
                .validate_completion(RecordRequirement::evaluate(required, exists))?;
        }

        let updated = self
            .io("update status", self.store.update_appointment_status(id, current.status, target))
            .await?;
        let Some(updated) = updated else {
            return Err(self.stale_write(id, current.status).await);
        };

        info!("Appointment {} moved from {} to {}", id, current.status, target);
        self.notify(self.state_machine.notification_for(current.status, target), &updated)
            .await;

        Ok(updated)
    }

    /// Cancels by deleting. Completed appointments are kept as history.
    pub async fn delete_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(id).await?;

        if !self.state_machine.can_delete(current.status) {
            warn!("Refusing to delete {} appointment {}", current.status, id);
            return Err(AppointmentError::DeletionNotAllowed(current.status));
        }

        let deleted = self
            .io("delete appointment", self.store.delete_appointment(id, current.status))
            .await?;
        if !deleted {
            return Err(self.stale_write(id, current.status).await);
        }

        info!("Appointment {} cancelled", id);
        self.notify(NotificationEvent::Cancelled, &current).await;

        Ok(current)
    }

    /// Reacts to a saved medical record. Vaccinations and dewormings with a
    /// next-due date get a follow-up appointment on that date. The follow-up
    /// is best effort: its failure lands in the outcome, not in the result.
    pub async fn record_created(
        &self,
        event: RecordCreatedEvent,
    ) -> Result<CascadeOutcome, AppointmentError> {
        let Some(due_date) = event.next_due_date else {
            return Ok(CascadeOutcome::default());
        };
        if !event.record_type.schedules_follow_up() {
            debug!("{} records do not schedule follow-ups", event.record_type);
            return Ok(CascadeOutcome::default());
        }

        match self.schedule_follow_up(&event, due_date).await {
            Ok(follow_up) => {
                info!("Follow-up appointment {} scheduled for {} from {} record {:?}",
                      follow_up.id, due_date, event.record_type, event.record_id);
                Ok(CascadeOutcome {
                    follow_up: Some(follow_up),
                    cascade_error: None,
                })
            }
            Err(e) => {
                let failure = AppointmentError::CascadeFailed(e.to_string());
                warn!("{}", failure);
                Ok(CascadeOutcome {
                    follow_up: None,
                    cascade_error: Some(failure.to_string()),
                })
            }
        }
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn schedule_follow_up(
        &self,
        event: &RecordCreatedEvent,
        due_date: NaiveDate,
    ) -> Result<Appointment, AppointmentError> {
        let source = match event.appointment_id {
            Some(id) if event.user_id.is_none() || event.pet_id.is_none() || event.service_id.is_none() => {
                Some(self.get_appointment(id).await?)
            }
            _ => None,
        };

        let user_id = event.user_id.or(source.as_ref().map(|a| a.user_id));
        let pet_id = event.pet_id.or(source.as_ref().map(|a| a.pet_id));
        let service_id = event.service_id.or(source.as_ref().map(|a| a.service_id));

        let (Some(user_id), Some(pet_id), Some(service_id)) = (user_id, pet_id, service_id) else {
            return Err(AppointmentError::ValidationError(
                "Follow-up needs an owner, pet, and service".to_string(),
            ));
        };

        let pending = self
            .insert(NewAppointment {
                user_id,
                pet_id,
                service_id,
                date: due_date,
                time: self.config.follow_up_time,
                status: AppointmentStatus::Pending,
                notes: Some(format!("Follow-up {}", event.record_type.label().to_lowercase())),
            })
            .await?;

        self.transition_status(pending.id, AppointmentStatus::Scheduled).await
    }

    fn validate_booking(
        &self,
        request: CreateAppointmentRequest,
        origin: BookingOrigin,
    ) -> Result<NewAppointment, AppointmentError> {
        let mut missing = Vec::new();
        if request.user_id.is_none() {
            missing.push("owner");
        }
        if request.pet_id.is_none() {
            missing.push("pet");
        }
        if request.service_id.is_none() {
            missing.push("service");
        }
        if request.date.is_none() {
            missing.push("date");
        }
        if request.time.is_none() {
            missing.push("time");
        }

        let (Some(user_id), Some(pet_id), Some(service_id), Some(date), Some(time)) =
            (request.user_id, request.pet_id, request.service_id, request.date, request.time)
        else {
            return Err(AppointmentError::ValidationError(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        };

        if !self.calendar.is_on_grid(date, time) {
            warn!("Rejected off-grid booking at {} on {}", time, date);
            return Err(AppointmentError::OffGrid { date, time });
        }

        Ok(NewAppointment {
            user_id,
            pet_id,
            service_id,
            date,
            time: truncate_to_minute(time),
            status: origin.initial_status(),
            notes: request.notes.filter(|notes| !notes.trim().is_empty()),
        })
    }

    async fn insert(&self, data: NewAppointment) -> Result<Appointment, AppointmentError> {
        let created = self.io("create appointment", self.store.create_appointment(data)).await?;

        info!("Appointment {} created for {} at {} ({})",
              created.id, created.date, created.time, created.status);
        self.notify(NotificationEvent::Created, &created).await;

        Ok(created)
    }

    /// Explains a guarded write that matched no row: the appointment is gone,
    /// or another request changed its status after it was validated.
    async fn stale_write(&self, id: Uuid, expected: AppointmentStatus) -> AppointmentError {
        match self.get_appointment(id).await {
            Ok(actual) => {
                warn!("Appointment {} moved from {} to {} mid-request", id, expected, actual.status);
                AppointmentError::StatusChanged {
                    expected,
                    actual: actual.status,
                }
            }
            Err(e) => e,
        }
    }

    /// Runs a store call under the configured I/O timeout.
    async fn io<T, F>(&self, operation: &str, call: F) -> Result<T, AppointmentError>
    where
        F: Future<Output = Result<T, AppointmentError>>,
    {
        match tokio::time::timeout(self.config.io_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if e.is_transient() {
                    error!("Failed to {}: {}", operation, e);
                }
                Err(e)
            }
            Err(_) => {
                error!("Timed out trying to {}", operation);
                Err(AppointmentError::Timeout(operation.to_string()))
            }
        }
    }

    async fn notify(&self, event: NotificationEvent, appointment: &Appointment) {
        match tokio::time::timeout(self.config.io_timeout, self.notifier.notify(event, appointment)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Notification {:?} for {} failed: {}", event, appointment.id, e),
            Err(_) => error!("Notification {:?} for {} timed out", event, appointment.id),
        }
    }
}

/// Record type required by a service name; exposed for the record-creation UI.
pub fn required_record_for(service_name: &str) -> RecordType {
    RecordType::for_service(service_name)
}
