use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod bookings;
pub mod handlers;

/// Build the Management API router.
/// All routes are relative; the caller mounts this under `/api/v1`.
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings/pending", get(bookings::list_pending))
        .route("/bookings/:id/decision", post(bookings::decide_booking))
        .route("/classrooms", get(bookings::list_classrooms))
        .route(
            "/classrooms/:room_no/status",
            put(bookings::set_classroom_status),
        )
        .route("/repairs/run", post(bookings::run_repairs))
        .route(
            "/alerts",
            get(handlers::list_alerts).post(handlers::create_alert),
        )
        .route(
            "/alerts/:id",
            put(handlers::update_alert).delete(handlers::delete_alert),
        )
        .route("/documents", get(handlers::list_documents))
        .route("/documents/:id", delete(handlers::delete_alert))
        .route(
            "/users/:kind",
            get(handlers::list_members).post(handlers::create_member),
        )
        .route("/users/:kind/:id", delete(handlers::delete_member))
        .route("/users/:kind/:id/toggle", post(handlers::toggle_member))
        .route("/dashboard", get(handlers::get_dashboard))
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .layer(middleware::from_fn_with_state(state, admin_auth))
        .layer(TraceLayer::new_for_http())
        .fallback(fallback_404)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Middleware: validates `X-Admin-Key` (or a bearer token) against the configured admin key.
async fn admin_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided_key = req
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| t.trim())
        });

    let expected = state.config.admin_key.as_bytes();

    match provided_key {
        Some(k) if bool::from(k.as_bytes().ct_eq(expected)) => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!("admin API: invalid key");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("admin API: missing X-Admin-Key header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
