// libs/appointment-cell/tests/store_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    AppointmentError, AppointmentFilter, AppointmentStatus, NewAppointment,
};
use appointment_cell::services::{AppointmentStore, RecordType, SupabaseAppointmentStore};
use shared_database::supabase::SupabaseClient;

const SERVICE_ID: &str = "6ba7b811-9dad-11d1-80b4-00c04fd430c8";

fn store(server: &MockServer) -> SupabaseAppointmentStore {
    let client = SupabaseClient::with_base_url(&server.uri(), "test-anon-key");
    SupabaseAppointmentStore::new(Arc::new(client))
}

fn row(id: Uuid, status: &str, time: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
        "pet_id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
        "service_id": SERVICE_ID,
        "date": "2026-10-19",
        "time": time,
        "status": status,
        "notes": null,
        "service": {
            "id": SERVICE_ID,
            "name": "Immunization",
            "description": "Core vaccines",
            "price": 850.0,
            "duration_minutes": 30
        },
        "created_at": "2026-10-10T03:15:00Z"
    })
}

#[tokio::test]
async fn finds_appointments_with_embedded_service() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.scheduled"))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row(id, "scheduled", "1970-01-01T10:00:00.000Z")
        ])))
        .mount(&server)
        .await;

    let filter = AppointmentFilter {
        statuses: vec![AppointmentStatus::Scheduled],
        ..Default::default()
    };
    let found = store(&server).find_appointments(&filter).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
    assert_eq!(found[0].time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    assert_eq!(found[0].service_name(), Some("Immunization"));
    assert_eq!(found[0].required_record(), RecordType::Vaccination);
}

#[tokio::test]
async fn creates_with_separate_date_and_time_columns() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "date": "2026-10-19",
            "time": "09:30:00",
            "status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            row(id, "pending", "09:30:00")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let created = store(&server)
        .create_appointment(NewAppointment {
            user_id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            service_id: Uuid::parse_str(SERVICE_ID).unwrap(),
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            status: AppointmentStatus::Pending,
            notes: None,
        })
        .await
        .unwrap();

    assert_eq!(created.id, id);
    assert_eq!(created.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn updates_status_by_id() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("status", "eq.pending"))
        .and(body_partial_json(json!({ "status": "scheduled" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row(id, "scheduled", "10:00:00")
        ])))
        .mount(&server)
        .await;

    let updated = store(&server)
        .update_appointment_status(id, AppointmentStatus::Pending, AppointmentStatus::Scheduled)
        .await
        .unwrap();
    assert_eq!(updated.map(|a| a.status), Some(AppointmentStatus::Scheduled));
}

#[tokio::test]
async fn guarded_writes_report_an_unmatched_row() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("status", "eq.scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    assert!(!store.delete_appointment(id, AppointmentStatus::Scheduled).await.unwrap());
    let updated = store
        .update_appointment_status(id, AppointmentStatus::Scheduled, AppointmentStatus::Missed)
        .await
        .unwrap();
    assert!(updated.is_none());
}

#[tokio::test]
async fn booked_times_drop_the_sentinel_date() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "time"))
        .and(query_param("date", "eq.2026-10-18"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "time": "1970-01-01T09:00:00.000Z" },
            { "time": "10:15:00" }
        ])))
        .mount(&server)
        .await;

    let booked = store(&server)
        .find_booked_times(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
        .await
        .unwrap();

    assert_eq!(
        booked,
        vec![
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 15, 0).unwrap()
        ]
    );
}

#[tokio::test]
async fn record_lookup_targets_the_record_table() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/dewormings"))
        .and(query_param("appointment_id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/vaccinations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store(&server);
    assert!(store.record_exists(appointment_id, RecordType::Deworming).await.unwrap());
    assert!(!store.record_exists(appointment_id, RecordType::Vaccination).await.unwrap());
    assert!(!store.record_exists(appointment_id, RecordType::None).await.unwrap());
}

#[tokio::test]
async fn server_errors_become_database_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let result = store(&server).find_appointments(&AppointmentFilter::default()).await;
    assert_matches!(result, Err(AppointmentError::DatabaseError(msg)) => {
        assert!(msg.contains("503"));
    });
}
