use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::bookings::parse_id;
use crate::errors::AppError;
use crate::models::admin::{AdminProfile, ConsoleSettings, ProfileUpdate};
use crate::models::alert::{Alert, AlertInput, AlertType};
use crate::models::dashboard::Dashboard;
use crate::models::user::{Member, MemberKind, NewMember};
use crate::AppState;

const RECENT_ALERTS: i64 = 3;
const RECENT_BOOKINGS: i64 = 2;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct CreateAlertRequest {
    #[serde(flatten)]
    pub alert: AlertInput,
    /// Email of the posting admin; must exist in `admins`.
    pub posted_by_email: String,
}

#[derive(Deserialize)]
pub struct DocumentQuery {
    pub r#type: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub r#type: AlertType,
    pub file_url: String,
    /// Public link, when a storage base URL is configured.
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

fn validate_alert(input: AlertInput) -> Result<AlertInput, AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::InvalidRequest("title is required".into()));
    }
    let input = input.normalized();
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end < start {
            return Err(AppError::InvalidRequest("end_date precedes start_date".into()));
        }
    }
    Ok(input)
}

// ── Alerts ───────────────────────────────────────────────────

/// GET /api/v1/alerts: newest first
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Alert>>, AppError> {
    Ok(Json(state.db.list_alerts().await?))
}

/// POST /api/v1/alerts: post an alert, circular or event
pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAlertRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Alert>), AppError> {
    let Json(payload) = payload?;
    let input = validate_alert(payload.alert)?;
    let admin = state
        .db
        .get_admin_by_email(&payload.posted_by_email)
        .await?
        .ok_or_else(|| {
            tracing::warn!("create_alert: no admin record for {}", payload.posted_by_email);
            AppError::InvalidRequest("admin record not found for posted_by_email".into())
        })?;

    let alert = state.db.insert_alert(&input, admin.id).await?;
    tracing::info!(alert_id = %alert.id, "alert posted");
    Ok((StatusCode::CREATED, Json(alert)))
}

/// PUT /api/v1/alerts/:id
pub async fn update_alert(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    payload: Result<Json<AlertInput>, JsonRejection>,
) -> Result<Json<Alert>, AppError> {
    let id = parse_id(&id_str)?;
    let Json(payload) = payload?;
    let input = validate_alert(payload)?;
    let alert = state
        .db
        .update_alert(id, &input)
        .await?
        .ok_or(AppError::NotFound("alert"))?;
    Ok(Json(alert))
}

/// DELETE /api/v1/alerts/:id (also mounted at /documents/:id)
pub async fn delete_alert(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&id_str)?;
    let deleted = state.db.delete_alert(id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

// ── Documents ────────────────────────────────────────────────

/// GET /api/v1/documents?type=: alerts carrying an attached file
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    params: Result<Query<DocumentQuery>, QueryRejection>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let Query(params) = params?;
    let kind = match params.r#type.as_deref() {
        None | Some("") | Some("All") | Some("all") => None,
        Some(raw) => Some(
            raw.parse::<AlertType>()
                .map_err(|e| AppError::InvalidRequest(e.to_string()))?,
        ),
    };

    let docs = state
        .db
        .list_documents(kind)
        .await?
        .into_iter()
        .filter_map(|a| {
            let file_url = a.file_url?;
            Some(DocumentResponse {
                link: state.config.document_link(&file_url),
                id: a.id,
                title: a.title,
                description: a.description,
                r#type: a.r#type,
                file_url,
                created_at: a.created_at,
            })
        })
        .collect();
    Ok(Json(docs))
}

// ── Users ────────────────────────────────────────────────────

/// GET /api/v1/users/:kind: students or teachers, by name
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    kind: Result<Path<MemberKind>, PathRejection>,
) -> Result<Json<Vec<Member>>, AppError> {
    let Path(kind) = kind?;
    Ok(Json(state.db.list_members(kind).await?))
}

/// POST /api/v1/users/:kind: add a student or teacher (starts Active)
pub async fn create_member(
    State(state): State<Arc<AppState>>,
    kind: Result<Path<MemberKind>, PathRejection>,
    payload: Result<Json<NewMember>, JsonRejection>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    let Path(kind) = kind?;
    let Json(payload) = payload?;
    let fields = [&payload.code, &payload.name, &payload.branch, &payload.email];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(AppError::InvalidRequest("please fill all fields".into()));
    }
    if !EMAIL_RE.is_match(payload.email.trim()) {
        return Err(AppError::InvalidRequest(format!("invalid email: {}", payload.email)));
    }

    let member = state.db.insert_member(kind, &payload).await?;
    tracing::info!(kind = kind.table(), member_id = %member.id, "member added");
    Ok((StatusCode::CREATED, Json(member)))
}

/// DELETE /api/v1/users/:kind/:id
pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(MemberKind, String)>, PathRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Path((kind, id_str)) = path?;
    let id = parse_id(&id_str)?;
    let deleted = state.db.delete_member(kind, id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// POST /api/v1/users/:kind/:id/toggle: Active ↔ Inactive
pub async fn toggle_member(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(MemberKind, String)>, PathRejection>,
) -> Result<Json<Member>, AppError> {
    let Path((kind, id_str)) = path?;
    let id = parse_id(&id_str)?;
    let member = state
        .db
        .toggle_member_status(kind, id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(Json(member))
}

// ── Dashboard ────────────────────────────────────────────────

/// GET /api/v1/dashboard: counters plus recent activity
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Dashboard>, AppError> {
    let stats = state.db.dashboard_stats().await?;
    let activity = state.db.recent_activity(RECENT_ALERTS, RECENT_BOOKINGS).await?;
    Ok(Json(Dashboard::new(stats, activity)))
}

// ── Profile & Settings ───────────────────────────────────────

/// GET /api/v1/profile?email=
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    params: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<AdminProfile>, AppError> {
    let Query(params) = params?;
    let profile = state
        .db
        .get_admin_by_email(&params.email)
        .await?
        .ok_or(AppError::NotFound("admin"))?;
    Ok(Json(profile))
}

/// PUT /api/v1/profile?email=
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    params: Result<Query<EmailQuery>, QueryRejection>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<AdminProfile>, AppError> {
    let Query(params) = params?;
    let Json(payload) = payload?;
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidRequest("name is required".into()));
    }
    let profile = state
        .db
        .update_admin_profile(&params.email, &payload)
        .await?
        .ok_or(AppError::NotFound("admin"))?;
    Ok(Json(profile))
}

/// GET /api/v1/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConsoleSettings>, AppError> {
    let settings = state
        .db
        .get_system_setting::<ConsoleSettings>(ConsoleSettings::KEY)
        .await?
        .unwrap_or_default();
    Ok(Json(settings))
}

/// PUT /api/v1/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConsoleSettings>, JsonRejection>,
) -> Result<Json<ConsoleSettings>, AppError> {
    let Json(payload) = payload?;
    state
        .db
        .set_system_setting(ConsoleSettings::KEY, &payload, Some("admin console preferences"))
        .await?;
    Ok(Json(payload))
}
