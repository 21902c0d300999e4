// libs/shared/database/tests/postgrest_test.rs

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::{AppConfig, StoreBackend};
use shared_database::{SchedulingStore, StoreError, SupabaseStore};
use shared_models::scheduling::{
    Appointment, AppointmentStatus, DeliveryStatus, EnqueueOutcome, NotificationIntent, NotificationKind,
};

fn config(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "test-secret".to_string(),
        store_backend: StoreBackend::Supabase,
        ..Default::default()
    }
}

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().and_hms_opt(h, m, 0).unwrap()
}

fn appointment(status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        professional_id: Uuid::new_v4(),
        service_id: Uuid::new_v4(),
        start_time: at(10, 0),
        end_time: at(11, 0),
        status,
        notes: None,
        created_at: at(8, 0),
        updated_at: at(8, 0),
    }
}

fn reminder(appointment_id: Uuid) -> NotificationIntent {
    NotificationIntent {
        id: Uuid::new_v4(),
        idempotency_key: Some(format!("reminder:{}", appointment_id)),
        kind: NotificationKind::Reminder,
        appointment_id,
        recipient_id: Uuid::new_v4(),
        phone: "+15550000001".to_string(),
        message: "See you tomorrow".to_string(),
        status: DeliveryStatus::Pending,
        attempts: 0,
        last_error: None,
        next_attempt_at: at(8, 0),
        created_at: at(8, 0),
        sent_at: None,
    }
}

#[tokio::test]
async fn overlapping_insert_maps_to_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23P01",
            "message": "conflicting key value violates exclusion constraint"
        })))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config(&server));
    let result = store.insert_appointment(&appointment(AppointmentStatus::Pending)).await;

    assert_matches!(result, Err(StoreError::Conflict(_)));
}

#[tokio::test]
async fn successful_insert_accepts_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("Prefer", "return=minimal"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config(&server));
    store
        .insert_appointment(&appointment(AppointmentStatus::Pending))
        .await
        .unwrap();
}

#[tokio::test]
async fn reminder_enqueue_reports_duplicates() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let first = reminder(appointment_id);

    Mock::given(method("POST"))
        .and(path("/rest/v1/notification_outbox"))
        .and(query_param("on_conflict", "idempotency_key"))
        .and(body_partial_json(json!({ "id": first.id })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([first])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/notification_outbox"))
        .and(query_param("on_conflict", "idempotency_key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config(&server));

    assert_eq!(store.enqueue_notification(&first).await.unwrap(), EnqueueOutcome::Enqueued);
    assert_eq!(
        store.enqueue_notification(&reminder(appointment_id)).await.unwrap(),
        EnqueueOutcome::Duplicate
    );
}

#[tokio::test]
async fn stale_status_update_is_a_conflict() {
    let server = MockServer::start().await;
    let current = appointment(AppointmentStatus::Cancelled);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", current.id)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", current.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config(&server));
    let result = store
        .update_appointment_status(current.id, AppointmentStatus::Pending, AppointmentStatus::Confirmed, at(9, 0))
        .await;

    assert_matches!(result, Err(StoreError::Conflict(_)));
}

#[tokio::test]
async fn status_update_on_missing_row_is_not_found() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config(&server));
    let result = store
        .update_appointment_status(id, AppointmentStatus::Pending, AppointmentStatus::Confirmed, at(9, 0))
        .await;

    assert_matches!(result, Err(StoreError::NotFound(_)));
}

#[tokio::test]
async fn availability_replace_goes_through_rpc() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/replace_weekly_availability"))
        .and(body_partial_json(json!({ "p_professional_id": professional_id })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config(&server));
    store.replace_availability(professional_id, Vec::new()).await.unwrap();
}

#[tokio::test]
async fn batch_lookup_with_no_ids_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config(&server));
    assert!(store.get_users(&[]).await.unwrap().is_empty());
    assert!(store.get_services(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn server_errors_surface_as_backend_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config(&server));
    assert_matches!(store.get_user(Uuid::new_v4()).await, Err(StoreError::Backend(_)));
}

#[tokio::test]
async fn day_query_uses_exclusive_upper_bound() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let day_start = at(0, 0);
    let next_midnight = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("start_time", "gte.2024-06-03T00:00:00"))
        .and(query_param("start_time", "lt.2024-06-04T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseStore::new(&config(&server));
    let found = store
        .find_blocking_appointments(professional_id, day_start, next_midnight)
        .await
        .unwrap();

    assert!(found.is_empty());
}
