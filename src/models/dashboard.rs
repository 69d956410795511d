use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardStats {
    /// Students plus teachers.
    pub users: i64,
    pub alerts: i64,
    pub pending_bookings: i64,
    pub classrooms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    Alert {
        title: String,
        created_at: DateTime<Utc>,
    },
    Booking {
        room: String,
        purpose: String,
        status: String,
        created_at: DateTime<Utc>,
    },
}

impl Activity {
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Activity::Alert { created_at, .. } | Activity::Booking { created_at, .. } => *created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_activity: Vec<Activity>,
}

impl Dashboard {
    /// Merges both activity feeds, newest first.
    pub fn new(stats: DashboardStats, mut activity: Vec<Activity>) -> Self {
        activity.sort_by_key(|a| std::cmp::Reverse(a.created_at()));
        Self {
            stats,
            recent_activity: activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_activity_sorted_newest_first() {
        let older = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap();
        let stats = DashboardStats {
            users: 3,
            alerts: 1,
            pending_bookings: 1,
            classrooms: 2,
        };
        let dashboard = Dashboard::new(
            stats,
            vec![
                Activity::Alert {
                    title: "Holiday".into(),
                    created_at: older,
                },
                Activity::Booking {
                    room: "A-102".into(),
                    purpose: "Seminar".into(),
                    status: "Pending".into(),
                    created_at: newer,
                },
            ],
        );
        assert_eq!(dashboard.recent_activity[0].created_at(), newer);
        assert_eq!(dashboard.recent_activity[1].created_at(), older);
    }
}
