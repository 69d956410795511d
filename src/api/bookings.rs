//! Booking requests and classroom occupancy.
//!
//! Every write returns the new state of the touched booking; clients are
//! expected to refetch their lists afterwards.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::booking::{BookingRequest, BookingStatus};
use crate::models::classroom::{Classroom, Occupancy};
use crate::notification::webhook::WebhookEvent;
use crate::workflow::{RepairReport, WorkflowError};
use crate::AppState;

const REPAIR_BATCH: i64 = 50;

#[derive(Deserialize)]
pub struct BookingQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: String, // "approve" | "reject"
}

#[derive(Serialize)]
pub struct DecisionResponse {
    pub id: Uuid,
    pub status: BookingStatus,
    /// Only present for approvals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classroom_updated: Option<bool>,
}

#[derive(Deserialize)]
pub struct ClassroomStatusRequest {
    pub status: Occupancy,
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidRequest(format!("invalid id: {}", raw)))
}

/// GET /api/v1/bookings: every booking, optionally filtered by status
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    params: Result<Query<BookingQuery>, QueryRejection>,
) -> Result<Json<Vec<BookingRequest>>, AppError> {
    let Query(params) = params?;
    let status = match params.status.as_deref() {
        None | Some("") | Some("All") | Some("all") => None,
        Some(raw) => Some(
            raw.parse::<BookingStatus>()
                .map_err(|e| AppError::InvalidRequest(e.to_string()))?,
        ),
    };
    Ok(Json(state.workflow.list(status).await?))
}

/// GET /api/v1/bookings/pending: requests awaiting a decision
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookingRequest>>, AppError> {
    Ok(Json(state.workflow.list_pending().await?))
}

/// POST /api/v1/bookings/:id/decision: approve or reject a pending request
pub async fn decide_booking(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<DecisionResponse>, AppError> {
    let id = parse_id(&id_str)?;
    let Json(payload) = payload?;
    let approve = match payload.decision.to_lowercase().as_str() {
        "approved" | "approve" => true,
        "rejected" | "reject" => false,
        other => {
            tracing::warn!("decide_booking: invalid decision: {}", other);
            return Err(AppError::InvalidRequest(format!("invalid decision: {}", other)));
        }
    };

    // The workflow itself does not refuse stale requests; the guard lives here.
    let booking = state.workflow.get(id).await?;
    if !booking.is_pending() {
        return Err(AppError::BookingNotPending {
            id,
            status: booking.status,
        });
    }

    if !approve {
        state.workflow.reject(id).await?;
        state
            .webhook
            .dispatch(WebhookEvent::booking_rejected(id, &booking.room));
        return Ok(Json(DecisionResponse {
            id,
            status: BookingStatus::Rejected,
            classroom_updated: None,
        }));
    }

    match state.workflow.approve(id).await {
        Ok(approval) => {
            state.webhook.dispatch(WebhookEvent::booking_approved(
                id,
                &approval.booking.room,
                approval.classroom_updated,
            ));
            Ok(Json(DecisionResponse {
                id,
                status: approval.booking.status,
                classroom_updated: Some(approval.classroom_updated),
            }))
        }
        Err(e) => {
            if let WorkflowError::ClassroomUpdate {
                booking_id,
                room,
                repair_queued,
                ..
            } = &e
            {
                state.webhook.dispatch(WebhookEvent::classroom_update_failed(
                    *booking_id,
                    room,
                    *repair_queued,
                ));
            }
            Err(e.into())
        }
    }
}

/// GET /api/v1/classrooms
pub async fn list_classrooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Classroom>>, AppError> {
    let rooms = state
        .directory
        .list_classrooms()
        .await
        .map_err(AppError::DirectoryUnavailable)?;
    Ok(Json(rooms))
}

/// PUT /api/v1/classrooms/:room_no/status: manual occupancy override
pub async fn set_classroom_status(
    State(state): State<Arc<AppState>>,
    Path(room_no): Path<String>,
    payload: Result<Json<ClassroomStatusRequest>, JsonRejection>,
) -> Result<Json<Classroom>, AppError> {
    let Json(payload) = payload?;
    let matched = state
        .directory
        .set_classroom_status(&room_no, payload.status)
        .await
        .map_err(AppError::DirectoryUnavailable)?;
    if !matched {
        return Err(AppError::NotFound("classroom"));
    }
    tracing::info!(room = %room_no, status = %payload.status, "classroom status set manually");
    Ok(Json(Classroom {
        room_no,
        status: payload.status,
    }))
}

/// POST /api/v1/repairs/run: replay queued occupancy repairs now
pub async fn run_repairs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RepairReport>, AppError> {
    Ok(Json(state.workflow.replay_repairs(REPAIR_BATCH).await?))
}
