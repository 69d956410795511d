//! Booking approval workflow.
//!
//! Moves a booking request out of Pending and, on approval, marks the
//! referenced classroom Occupied. The two writes are independent; when the
//! classroom write fails the booking stays Approved and the missing write is
//! queued in the occupancy repair log for a later replay.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::{BookingFilter, BookingRequest, BookingStatus};
use crate::models::classroom::Occupancy;
use crate::store::DirectoryStore;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(#[source] anyhow::Error),

    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    /// The booking write landed; only the classroom write failed.
    #[error("booking {booking_id} approved but classroom {room} was not marked occupied: {source}")]
    ClassroomUpdate {
        booking_id: Uuid,
        room: String,
        repair_queued: bool,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Approval {
    pub booking: BookingRequest,
    /// False when no classroom row matched the booking's room.
    pub classroom_updated: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RepairReport {
    pub attempted: usize,
    pub resolved: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct BookingWorkflow {
    store: Arc<dyn DirectoryStore>,
}

impl BookingWorkflow {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    pub async fn list_pending(&self) -> Result<Vec<BookingRequest>, WorkflowError> {
        self.fetch(BookingFilter::pending()).await
    }

    pub async fn list(&self, status: Option<BookingStatus>) -> Result<Vec<BookingRequest>, WorkflowError> {
        self.fetch(BookingFilter { status }).await
    }

    async fn fetch(&self, filter: BookingFilter) -> Result<Vec<BookingRequest>, WorkflowError> {
        self.store.list_bookings(filter).await.map_err(|e| {
            tracing::error!("list bookings failed: {}", e);
            WorkflowError::DirectoryUnavailable(e)
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<BookingRequest, WorkflowError> {
        self.store
            .get_booking(id)
            .await
            .map_err(WorkflowError::DirectoryUnavailable)?
            .ok_or(WorkflowError::BookingNotFound(id))
    }

    /// Approves the booking, then marks its room Occupied.
    ///
    /// Calling this on a booking that already left Pending is a caller error;
    /// it is logged and carried out anyway.
    pub async fn approve(&self, id: Uuid) -> Result<Approval, WorkflowError> {
        let mut booking = self.get(id).await?;
        if booking.status.is_terminal() {
            tracing::warn!(
                booking_id = %id,
                status = %booking.status,
                "approving a booking that is no longer pending"
            );
        }

        self.write_status(id, BookingStatus::Approved).await?;
        booking.status = BookingStatus::Approved;
        tracing::info!(booking_id = %id, room = %booking.room, "booking approved");

        let classroom_updated = match self
            .store
            .set_classroom_status(&booking.room, Occupancy::Occupied)
            .await
        {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(
                    booking_id = %id,
                    room = %booking.room,
                    error = %e,
                    "classroom update failed after approval"
                );
                let repair_queued = match self
                    .store
                    .record_occupancy_repair(id, &booking.room, &e.to_string())
                    .await
                {
                    Ok(repair_id) => {
                        tracing::info!(%repair_id, room = %booking.room, "queued occupancy repair");
                        true
                    }
                    Err(log_err) => {
                        tracing::error!(error = %log_err, "failed to queue occupancy repair");
                        false
                    }
                };
                return Err(WorkflowError::ClassroomUpdate {
                    booking_id: id,
                    room: booking.room,
                    repair_queued,
                    source: e,
                });
            }
        };

        if !classroom_updated {
            tracing::warn!(room = %booking.room, "no classroom matches approved booking's room");
        }

        Ok(Approval {
            booking,
            classroom_updated,
        })
    }

    /// Rejects the booking. Classrooms are never touched.
    pub async fn reject(&self, id: Uuid) -> Result<(), WorkflowError> {
        self.write_status(id, BookingStatus::Rejected).await?;
        tracing::info!(booking_id = %id, "booking rejected");
        Ok(())
    }

    /// Re-applies queued Occupied writes, oldest first.
    pub async fn replay_repairs(&self, batch: i64) -> Result<RepairReport, WorkflowError> {
        let repairs = self
            .store
            .pending_occupancy_repairs(batch)
            .await
            .map_err(WorkflowError::DirectoryUnavailable)?;

        let mut report = RepairReport::default();
        for repair in repairs {
            report.attempted += 1;
            match self
                .store
                .set_classroom_status(&repair.room_no, Occupancy::Occupied)
                .await
            {
                Ok(_) => match self.store.resolve_occupancy_repair(repair.id).await {
                    Ok(()) => report.resolved += 1,
                    Err(e) => {
                        // The room is Occupied; the entry stays open and is replayed next pass.
                        tracing::warn!(
                            repair_id = %repair.id,
                            room = %repair.room_no,
                            error = %e,
                            "classroom updated but repair entry not closed"
                        );
                        report.failed += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        repair_id = %repair.id,
                        room = %repair.room_no,
                        attempts = repair.attempts + 1,
                        error = %e,
                        "occupancy repair still failing"
                    );
                    if let Err(log_err) = self.store.note_repair_failure(repair.id, &e.to_string()).await {
                        tracing::error!(error = %log_err, "failed to record repair attempt");
                    }
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn write_status(&self, id: Uuid, status: BookingStatus) -> Result<(), WorkflowError> {
        let matched = self
            .store
            .set_booking_status(id, status)
            .await
            .map_err(|e| {
                tracing::error!(booking_id = %id, %status, "booking status write failed: {}", e);
                WorkflowError::DirectoryUnavailable(e)
            })?;
        if !matched {
            return Err(WorkflowError::BookingNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::{NaiveDate, Utc};

    fn pending(room: &str) -> BookingRequest {
        BookingRequest {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            room: room.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            time_slot: "09:00-10:00".to_string(),
            purpose: "Guest lecture".to_string(),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn setup() -> (MemoryStore, BookingWorkflow) {
        let store = MemoryStore::new();
        let workflow = BookingWorkflow::new(Arc::new(store.clone()));
        (store, workflow)
    }

    #[tokio::test]
    async fn test_approve_without_matching_classroom_still_succeeds() {
        let (store, workflow) = setup();
        let b = pending("Z-404");
        store.insert_booking(b.clone());

        let approval = workflow.approve(b.id).await.unwrap();
        assert!(!approval.classroom_updated);
        assert_eq!(store.booking(b.id).unwrap().status, BookingStatus::Approved);
    }

    #[tokio::test]
    async fn test_unknown_booking_is_not_found() {
        let (_store, workflow) = setup();
        let id = Uuid::new_v4();
        assert!(matches!(workflow.approve(id).await, Err(WorkflowError::BookingNotFound(x)) if x == id));
        assert!(matches!(workflow.reject(id).await, Err(WorkflowError::BookingNotFound(x)) if x == id));
    }

    #[tokio::test]
    async fn test_booking_write_failure_leaves_classroom_alone() {
        let (store, workflow) = setup();
        let b = pending("A-102");
        store.insert_booking(b.clone());
        store.insert_classroom("A-102", Occupancy::Available);
        store.fail_booking_writes(true);

        let err = workflow.approve(b.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::DirectoryUnavailable(_)));
        assert_eq!(store.booking(b.id).unwrap().status, BookingStatus::Pending);
        assert_eq!(store.classroom("A-102"), Some(Occupancy::Available));
    }

    #[tokio::test]
    async fn test_repair_log_failure_is_reported() {
        let (store, workflow) = setup();
        let b = pending("A-102");
        store.insert_booking(b.clone());
        store.insert_classroom("A-102", Occupancy::Available);
        store.fail_classroom_writes(true);
        store.fail_repair_log(true);

        match workflow.approve(b.id).await {
            Err(WorkflowError::ClassroomUpdate { repair_queued, .. }) => assert!(!repair_queued),
            other => panic!("expected ClassroomUpdate, got {:?}", other.map(|a| a.booking.id)),
        }
    }

    #[tokio::test]
    async fn test_replay_counts_failures_and_keeps_entry() {
        let (store, workflow) = setup();
        let b = pending("A-102");
        store.insert_booking(b.clone());
        store.insert_classroom("A-102", Occupancy::Available);
        store.fail_classroom_writes(true);
        let _ = workflow.approve(b.id).await;

        let report = workflow.replay_repairs(10).await.unwrap();
        assert_eq!(report, RepairReport { attempted: 1, resolved: 0, failed: 1 });
        let repairs = store.repairs();
        assert_eq!(repairs.len(), 1);
        assert_eq!(repairs[0].attempts, 1);
        assert!(repairs[0].resolved_at.is_none());
    }

    #[tokio::test]
    async fn test_replay_continues_when_entry_cannot_be_closed() {
        let (store, workflow) = setup();
        for room in ["R-1", "R-2"] {
            let b = pending(room);
            store.insert_booking(b.clone());
            store.insert_classroom(room, Occupancy::Available);
            store.fail_classroom_writes(true);
            let _ = workflow.approve(b.id).await;
            store.fail_classroom_writes(false);
        }
        assert_eq!(store.repairs().len(), 2);

        store.fail_repair_log(true);
        let report = workflow.replay_repairs(50).await.unwrap();
        assert_eq!(report, RepairReport { attempted: 2, resolved: 0, failed: 2 });
        assert_eq!(store.classroom("R-1"), Some(Occupancy::Occupied));
        assert_eq!(store.classroom("R-2"), Some(Occupancy::Occupied));
        assert!(store.repairs().iter().all(|r| r.resolved_at.is_none()));

        store.fail_repair_log(false);
        let report = workflow.replay_repairs(50).await.unwrap();
        assert_eq!(report, RepairReport { attempted: 2, resolved: 2, failed: 0 });
    }
}
