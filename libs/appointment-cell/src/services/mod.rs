pub mod availability;
pub mod calendar;
pub mod clock;
pub mod conflict;
pub mod lifecycle;
pub mod notification;
pub mod records;
pub mod status;
pub mod store;

pub use availability::SlotAvailabilityResolver;
pub use calendar::BusinessHoursCalendar;
pub use clock::{Clock, FixedClock, SystemClock};
pub use conflict::ConflictDetector;
pub use lifecycle::AppointmentLifecycleService;
pub use notification::{Notifier, TracingNotifier, WebhookNotifier};
pub use records::RecordType;
pub use status::{AppointmentStateMachine, RecordRequirement};
pub use store::{AppointmentStore, SupabaseAppointmentStore};
