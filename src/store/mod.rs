pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::booking::{BookingFilter, BookingRequest, BookingStatus};
use crate::models::classroom::{Classroom, Occupancy, OccupancyRepair};

/// The directory store as seen by the booking workflow.
/// Implementations: PgStore (PostgreSQL), MemoryStore (in-process).
///
/// Every call is one independent round-trip; nothing here spans two writes.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Bookings matching `filter`, oldest first (ties broken by id).
    async fn list_bookings(&self, filter: BookingFilter) -> anyhow::Result<Vec<BookingRequest>>;

    async fn get_booking(&self, id: Uuid) -> anyhow::Result<Option<BookingRequest>>;

    /// Returns false when no booking has this id.
    async fn set_booking_status(&self, id: Uuid, status: BookingStatus) -> anyhow::Result<bool>;

    async fn list_classrooms(&self) -> anyhow::Result<Vec<Classroom>>;

    /// Returns false when no classroom has this room number.
    async fn set_classroom_status(&self, room_no: &str, status: Occupancy) -> anyhow::Result<bool>;

    async fn record_occupancy_repair(
        &self,
        booking_id: Uuid,
        room_no: &str,
        error: &str,
    ) -> anyhow::Result<Uuid>;

    /// Unresolved repairs, oldest first.
    async fn pending_occupancy_repairs(&self, limit: i64) -> anyhow::Result<Vec<OccupancyRepair>>;

    async fn resolve_occupancy_repair(&self, id: Uuid) -> anyhow::Result<()>;

    async fn note_repair_failure(&self, id: Uuid, error: &str) -> anyhow::Result<()>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> anyhow::Result<()>;
}
