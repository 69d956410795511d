use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A room-reservation request submitted by a campus member.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct BookingRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub room: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub purpose: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl BookingRequest {
    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending
    }
}

/// Pending is the only state the workflow transitions out of.
/// Approved and Rejected are terminal.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "PascalCase")]
#[sqlx(type_name = "varchar", rename_all = "PascalCase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Approved => "Approved",
            BookingStatus::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            other => anyhow::bail!("unknown booking status: {}", other),
        }
    }
}

/// Filter applied when reading bookings from the directory store.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn pending() -> Self {
        Self {
            status: Some(BookingStatus::Pending),
        }
    }

    pub fn matches(&self, booking: &BookingRequest) -> bool {
        self.status.map_or(true, |s| booking.status == s)
    }
}
