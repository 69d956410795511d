//! In-process directory store.
//!
//! Backs local development and tests. Failure switches make individual
//! operations return errors the way an unreachable directory would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::booking::{BookingFilter, BookingRequest, BookingStatus};
use crate::models::classroom::{Classroom, Occupancy, OccupancyRepair};

use super::DirectoryStore;

#[derive(Default)]
struct Faults {
    fetches: AtomicBool,
    booking_writes: AtomicBool,
    classroom_writes: AtomicBool,
    repair_log: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    bookings: Arc<DashMap<Uuid, BookingRequest>>,
    classrooms: Arc<DashMap<String, Occupancy>>,
    repairs: Arc<DashMap<Uuid, OccupancyRepair>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_booking(&self, booking: BookingRequest) {
        self.bookings.insert(booking.id, booking);
    }

    pub fn insert_classroom(&self, room_no: &str, status: Occupancy) {
        self.classrooms.insert(room_no.to_string(), status);
    }

    pub fn booking(&self, id: Uuid) -> Option<BookingRequest> {
        self.bookings.get(&id).map(|b| b.clone())
    }

    pub fn classroom(&self, room_no: &str) -> Option<Occupancy> {
        self.classrooms.get(room_no).map(|c| *c)
    }

    pub fn repairs(&self) -> Vec<OccupancyRepair> {
        let mut all: Vec<_> = self.repairs.iter().map(|r| r.clone()).collect();
        all.sort_by_key(|r| r.created_at);
        all
    }

    pub fn fail_fetches(&self, on: bool) {
        self.faults.fetches.store(on, Ordering::SeqCst);
    }

    pub fn fail_booking_writes(&self, on: bool) {
        self.faults.booking_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_classroom_writes(&self, on: bool) {
        self.faults.classroom_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_repair_log(&self, on: bool) {
        self.faults.repair_log.store(on, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> anyhow::Result<()> {
        if flag.load(Ordering::SeqCst) {
            anyhow::bail!("directory store unreachable during {}", op);
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn list_bookings(&self, filter: BookingFilter) -> anyhow::Result<Vec<BookingRequest>> {
        Self::check(&self.faults.fetches, "list_bookings")?;
        let mut rows: Vec<BookingRequest> = self
            .bookings
            .iter()
            .filter(|b| filter.matches(b.value()))
            .map(|b| b.clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn get_booking(&self, id: Uuid) -> anyhow::Result<Option<BookingRequest>> {
        Self::check(&self.faults.fetches, "get_booking")?;
        Ok(self.booking(id))
    }

    async fn set_booking_status(&self, id: Uuid, status: BookingStatus) -> anyhow::Result<bool> {
        Self::check(&self.faults.booking_writes, "set_booking_status")?;
        match self.bookings.get_mut(&id) {
            Some(mut booking) => {
                booking.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_classrooms(&self) -> anyhow::Result<Vec<Classroom>> {
        Self::check(&self.faults.fetches, "list_classrooms")?;
        let mut rows: Vec<Classroom> = self
            .classrooms
            .iter()
            .map(|c| Classroom {
                room_no: c.key().clone(),
                status: *c.value(),
            })
            .collect();
        rows.sort_by(|a, b| a.room_no.cmp(&b.room_no));
        Ok(rows)
    }

    async fn set_classroom_status(&self, room_no: &str, status: Occupancy) -> anyhow::Result<bool> {
        Self::check(&self.faults.classroom_writes, "set_classroom_status")?;
        match self.classrooms.get_mut(room_no) {
            Some(mut current) => {
                *current = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_occupancy_repair(
        &self,
        booking_id: Uuid,
        room_no: &str,
        error: &str,
    ) -> anyhow::Result<Uuid> {
        Self::check(&self.faults.repair_log, "record_occupancy_repair")?;
        let id = Uuid::new_v4();
        self.repairs.insert(
            id,
            OccupancyRepair {
                id,
                booking_id,
                room_no: room_no.to_string(),
                attempts: 0,
                last_error: Some(error.to_string()),
                resolved_at: None,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn pending_occupancy_repairs(&self, limit: i64) -> anyhow::Result<Vec<OccupancyRepair>> {
        Self::check(&self.faults.fetches, "pending_occupancy_repairs")?;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .repairs()
            .into_iter()
            .filter(|r| r.resolved_at.is_none())
            .take(limit)
            .collect())
    }

    async fn resolve_occupancy_repair(&self, id: Uuid) -> anyhow::Result<()> {
        Self::check(&self.faults.repair_log, "resolve_occupancy_repair")?;
        if let Some(mut repair) = self.repairs.get_mut(&id) {
            repair.attempts += 1;
            repair.resolved_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn note_repair_failure(&self, id: Uuid, error: &str) -> anyhow::Result<()> {
        Self::check(&self.faults.repair_log, "note_repair_failure")?;
        if let Some(mut repair) = self.repairs.get_mut(&id) {
            repair.attempts += 1;
            repair.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Self::check(&self.faults.fetches, "ping")
    }
}
