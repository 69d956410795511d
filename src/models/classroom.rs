use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Classroom {
    pub room_no: String,
    pub status: Occupancy,
}

/// Coarse occupancy flag. Nothing in the workflow flips a room back to
/// Available; that only happens through an explicit reset.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "PascalCase")]
#[sqlx(type_name = "varchar", rename_all = "PascalCase")]
pub enum Occupancy {
    Available,
    Occupied,
}

impl std::fmt::Display for Occupancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Occupancy::Available => f.write_str("Available"),
            Occupancy::Occupied => f.write_str("Occupied"),
        }
    }
}

/// A queued Occupied write that failed after its booking was approved.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OccupancyRepair {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub room_no: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
