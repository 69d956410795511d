use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub office_name: Option<String>,
    pub department: Option<String>,
    pub campus: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub profile_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Editable profile fields. Email and role are owned by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub office_name: Option<String>,
    pub department: Option<String>,
    pub campus: Option<String>,
    pub phone: Option<String>,
    pub profile_url: Option<String>,
}

/// Console preferences persisted in `system_settings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleSettings {
    pub dark_mode: bool,
    pub email_notifications: bool,
    pub in_app_notifications: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            email_notifications: true,
            in_app_notifications: true,
        }
    }
}

impl ConsoleSettings {
    pub const KEY: &'static str = "console_preferences";
}
