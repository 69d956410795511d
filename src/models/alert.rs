use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An alert, circular or event posted by an administrator.
/// `file_url` holds the relative path inside the public file bucket.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[sqlx(rename = "type")]
    pub r#type: AlertType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub file_url: Option<String>,
    pub posted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "PascalCase")]
#[sqlx(type_name = "varchar", rename_all = "PascalCase")]
pub enum AlertType {
    Alert,
    Circular,
    Event,
}

impl std::str::FromStr for AlertType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alert" => Ok(AlertType::Alert),
            "circular" => Ok(AlertType::Circular),
            "event" => Ok(AlertType::Event),
            other => anyhow::bail!("unknown alert type: {}", other),
        }
    }
}

/// Field set written on insert and update.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub r#type: AlertType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub file_url: Option<String>,
}

impl AlertInput {
    /// Dates only apply to events; other types never carry them.
    pub fn normalized(mut self) -> Self {
        if self.r#type != AlertType::Event {
            self.start_date = None;
            self.end_date = None;
        }
        self.file_url = self.file_url.filter(|f| !f.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(kind: AlertType) -> AlertInput {
        AlertInput {
            title: "Exam schedule".into(),
            description: String::new(),
            r#type: kind,
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 5),
            file_url: Some("  ".into()),
        }
    }

    #[test]
    fn test_non_event_drops_dates() {
        let normalized = input(AlertType::Circular).normalized();
        assert!(normalized.start_date.is_none());
        assert!(normalized.end_date.is_none());
        assert!(normalized.file_url.is_none());
    }

    #[test]
    fn test_event_keeps_dates() {
        let normalized = input(AlertType::Event).normalized();
        assert_eq!(normalized.start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(normalized.end_date, NaiveDate::from_ymd_opt(2025, 3, 5));
    }
}
