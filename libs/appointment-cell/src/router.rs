// libs/appointment-cell/src/router.rs
use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::handlers::{self, AppointmentState};

/// Authentication is enforced in front of this router; the self-service and
/// staff booking flows are split by path.
pub fn appointment_routes(state: AppointmentState) -> Router {
    Router::new()
        // Booking
        .route("/slots", get(handlers::get_available_slots))
        .route("/", post(handlers::book_appointment).get(handlers::list_appointments))
        .route("/admin", post(handlers::admin_book_appointment))

        // Lifecycle
        .route("/{appointment_id}", get(handlers::get_appointment).delete(handlers::cancel_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))

        // Medical record hooks
        .route("/records", post(handlers::record_created))
        .route("/services/{service_name}/record-type", get(handlers::get_service_record_type))

        .with_state(state)
}
