//! Management API routes backed by the in-process directory store.
//!
//! The Postgres pool is created lazily and never touched by these routes,
//! so no database is needed: `cargo test --test api`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use campus_admin::config::Config;
use campus_admin::models::booking::{BookingRequest, BookingStatus};
use campus_admin::models::classroom::Occupancy;
use campus_admin::notification::webhook::WebhookNotifier;
use campus_admin::store::memory::MemoryStore;
use campus_admin::store::postgres::PgStore;
use campus_admin::{api, AppState};

const ADMIN_KEY: &str = "test-admin-key";

fn test_config() -> Config {
    Config {
        port: 0,
        database_url: "postgres://localhost/campus_test".into(),
        admin_key: ADMIN_KEY.into(),
        storage_public_url: None,
        webhook_urls: vec![],
        webhook_secret: None,
        repair_interval_secs: 0,
        dashboard_origin: "http://localhost:3000".into(),
    }
}

fn app(store: &MemoryStore) -> Router {
    let cfg = test_config();
    let db = PgStore::connect_lazy(&cfg.database_url).unwrap();
    let webhook = WebhookNotifier::new(vec![], None).unwrap();
    let state = AppState::new(db, Arc::new(store.clone()), webhook, cfg);
    Router::new()
        .nest("/api/v1", api::api_router(state.clone()))
        .with_state(state)
}

fn pending(room: &str) -> BookingRequest {
    BookingRequest {
        id: Uuid::new_v4(),
        requester_id: Uuid::new_v4(),
        room: room.to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        time_slot: "10:00-11:00".to_string(),
        purpose: "Workshop".to_string(),
        status: BookingStatus::Pending,
        created_at: Utc::now(),
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-admin-key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-admin-key", ADMIN_KEY)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn decision(id: Uuid, decision: &str) -> Request<Body> {
    send_json(
        "POST",
        &format!("/api/v1/bookings/{}/decision", id),
        serde_json::json!({ "decision": decision }),
    )
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_unauthorized() {
        let store = MemoryStore::new();
        let req = Request::builder()
            .uri("/api/v1/bookings/pending")
            .body(Body::empty())
            .unwrap();
        let resp = app(&store).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_key_is_unauthorized() {
        let store = MemoryStore::new();
        let req = Request::builder()
            .uri("/api/v1/bookings/pending")
            .header("x-admin-key", "nope")
            .body(Body::empty())
            .unwrap();
        let resp = app(&store).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bearer_token_is_accepted() {
        let store = MemoryStore::new();
        let req = Request::builder()
            .uri("/api/v1/bookings/pending")
            .header("authorization", format!("Bearer {}", ADMIN_KEY))
            .body(Body::empty())
            .unwrap();
        let resp = app(&store).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

mod bookings {
    use super::*;

    #[tokio::test]
    async fn test_pending_list_only_shows_pending() {
        let store = MemoryStore::new();
        let p = pending("A-101");
        let mut done = pending("A-102");
        done.status = BookingStatus::Approved;
        store.insert_booking(p.clone());
        store.insert_booking(done);

        let resp = app(&store).oneshot(get("/api/v1/bookings/pending")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], p.id.to_string());
        assert_eq!(rows[0]["status"], "Pending");
    }

    #[tokio::test]
    async fn test_status_filter_and_bad_status() {
        let store = MemoryStore::new();
        let mut r = pending("A-101");
        r.status = BookingStatus::Rejected;
        store.insert_booking(r);
        store.insert_booking(pending("A-102"));

        let resp = app(&store)
            .oneshot(get("/api/v1/bookings?status=Rejected"))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

        let resp = app(&store).oneshot(get("/api/v1/bookings?status=All")).await.unwrap();
        assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);

        let resp = app(&store)
            .oneshot(get("/api/v1/bookings?status=Cancelled"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_approve_occupies_room() {
        let store = MemoryStore::new();
        let b = pending("A-102");
        store.insert_booking(b.clone());
        store.insert_classroom("A-102", Occupancy::Available);

        let resp = app(&store).oneshot(decision(b.id, "approve")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "Approved");
        assert_eq!(body["classroom_updated"], true);
        assert_eq!(store.classroom("A-102"), Some(Occupancy::Occupied));
    }

    #[tokio::test]
    async fn test_reject_has_no_classroom_field() {
        let store = MemoryStore::new();
        let b = pending("A-103");
        store.insert_booking(b.clone());
        store.insert_classroom("A-103", Occupancy::Available);

        let resp = app(&store).oneshot(decision(b.id, "Rejected")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "Rejected");
        assert!(body.get("classroom_updated").is_none());
        assert_eq!(store.booking(b.id).unwrap().status, BookingStatus::Rejected);
        assert_eq!(store.classroom("A-103"), Some(Occupancy::Available));
    }

    #[tokio::test]
    async fn test_decided_booking_conflicts() {
        let store = MemoryStore::new();
        let mut b = pending("A-102");
        b.status = BookingStatus::Approved;
        store.insert_booking(b.clone());

        let resp = app(&store).oneshot(decision(b.id, "reject")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = json_body(resp).await;
        assert_eq!(body["error"]["code"], "booking_not_pending");
        assert_eq!(store.booking(b.id).unwrap().status, BookingStatus::Approved);
    }

    #[tokio::test]
    async fn test_classroom_failure_reports_partial_update() {
        let store = MemoryStore::new();
        let b = pending("A-105");
        store.insert_booking(b.clone());
        store.insert_classroom("A-105", Occupancy::Available);
        store.fail_classroom_writes(true);

        let resp = app(&store).oneshot(decision(b.id, "approve")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(resp).await;
        assert_eq!(body["error"]["code"], "classroom_update_failed");
        assert_eq!(store.booking(b.id).unwrap().status, BookingStatus::Approved);
        assert_eq!(store.repairs().len(), 1);

        store.fail_classroom_writes(false);
        let resp = app(&store)
            .oneshot(send_json("POST", "/api/v1/repairs/run", Value::Null))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["resolved"], 1);
        assert_eq!(store.classroom("A-105"), Some(Occupancy::Occupied));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let store = MemoryStore::new();

        let resp = app(&store).oneshot(decision(Uuid::new_v4(), "approve")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app(&store)
            .oneshot(send_json(
                "POST",
                "/api/v1/bookings/not-a-uuid/decision",
                serde_json::json!({ "decision": "approve" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_decision_is_bad_request() {
        let store = MemoryStore::new();
        let b = pending("A-102");
        store.insert_booking(b.clone());

        let resp = app(&store).oneshot(decision(b.id, "maybe")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.booking(b.id).unwrap().status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_store_outage_is_service_unavailable() {
        let store = MemoryStore::new();
        store.fail_fetches(true);

        let resp = app(&store).oneshot(get("/api/v1/bookings/pending")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(resp).await;
        assert_eq!(body["error"]["code"], "directory_unavailable");
    }
}

mod classrooms {
    use super::*;

    #[tokio::test]
    async fn test_list_and_manual_reset() {
        let store = MemoryStore::new();
        store.insert_classroom("B-201", Occupancy::Occupied);
        store.insert_classroom("A-101", Occupancy::Available);

        let resp = app(&store).oneshot(get("/api/v1/classrooms")).await.unwrap();
        let body = json_body(resp).await;
        assert_eq!(body[0]["room_no"], "A-101");
        assert_eq!(body[1]["status"], "Occupied");

        let resp = app(&store)
            .oneshot(send_json(
                "PUT",
                "/api/v1/classrooms/B-201/status",
                serde_json::json!({ "status": "Available" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(store.classroom("B-201"), Some(Occupancy::Available));
    }

    #[tokio::test]
    async fn test_reset_unknown_room_is_not_found() {
        let store = MemoryStore::new();
        let resp = app(&store)
            .oneshot(send_json(
                "PUT",
                "/api/v1/classrooms/Z-999/status",
                serde_json::json!({ "status": "Available" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

mod malformed_input {
    use super::*;

    async fn assert_invalid_request(resp: axum::response::Response) {
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["error"]["code"], "invalid_request");
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_decision_body_without_decision_field() {
        let store = MemoryStore::new();
        let b = pending("A-102");
        store.insert_booking(b.clone());

        let resp = app(&store)
            .oneshot(send_json(
                "POST",
                &format!("/api/v1/bookings/{}/decision", b.id),
                serde_json::json!({ "verdict": "approve" }),
            ))
            .await
            .unwrap();
        assert_invalid_request(resp).await;
        assert_eq!(store.booking(b.id).unwrap().status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_lowercase_occupancy_is_rejected_as_json_error() {
        let store = MemoryStore::new();
        store.insert_classroom("B-201", Occupancy::Occupied);

        let resp = app(&store)
            .oneshot(send_json(
                "PUT",
                "/api/v1/classrooms/B-201/status",
                serde_json::json!({ "status": "available" }),
            ))
            .await
            .unwrap();
        assert_invalid_request(resp).await;
        assert_eq!(store.classroom("B-201"), Some(Occupancy::Occupied));
    }

    #[tokio::test]
    async fn test_body_that_is_not_json() {
        let store = MemoryStore::new();
        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/bookings/{}/decision", Uuid::new_v4()))
            .header("x-admin-key", ADMIN_KEY)
            .header("content-type", "application/json")
            .body(Body::from("{decision: approve"))
            .unwrap();
        assert_invalid_request(app(&store).oneshot(req).await.unwrap()).await;
    }

    #[tokio::test]
    async fn test_unknown_member_kind() {
        let store = MemoryStore::new();
        let resp = app(&store).oneshot(get("/api/v1/users/admins")).await.unwrap();
        assert_invalid_request(resp).await;
    }

    #[tokio::test]
    async fn test_profile_without_email_query() {
        let store = MemoryStore::new();
        let resp = app(&store).oneshot(get("/api/v1/profile")).await.unwrap();
        assert_invalid_request(resp).await;
    }
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let store = MemoryStore::new();
    let resp = app(&store).oneshot(get("/api/v1/nowhere")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
