use axum::{
    Router,
    routing::get,
};

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::appointment_routes;

pub fn create_router(state: AppointmentState) -> Router {
    Router::new()
        .route("/", get(|| async { "Vet Clinic API is running!" }))
        .nest("/appointments", appointment_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use appointment_cell::services::AppointmentLifecycleService;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use shared_config::AppConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            notification_webhook_url: None,
            port: 3000,
            scheduling: Default::default(),
        };
        create_router(Arc::new(AppointmentLifecycleService::new(&config)))
    }

    #[tokio::test]
    async fn root_reports_running() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Vet Clinic API is running!");
    }

    #[tokio::test]
    async fn appointment_routes_are_nested() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/appointments/services/Immunization/record-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["record_type"], "Vaccination");
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let response = app()
            .oneshot(Request::builder().uri("/auth/login").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
