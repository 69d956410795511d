use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which directory table a campus member lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Students,
    Teachers,
}

impl MemberKind {
    pub fn table(&self) -> &'static str {
        match self {
            MemberKind::Students => "students",
            MemberKind::Teachers => "teachers",
        }
    }

    /// Column holding the institution-issued identifier (roll number or teacher id).
    pub fn code_column(&self) -> &'static str {
        match self {
            MemberKind::Students => "roll_no",
            MemberKind::Teachers => "tid",
        }
    }
}

/// Student or teacher row. `code` maps to `roll_no` / `tid`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub branch: Option<String>,
    pub email: String,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "PascalCase")]
#[sqlx(type_name = "varchar", rename_all = "PascalCase")]
pub enum MemberStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub code: String,
    pub name: String,
    pub branch: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_columns() {
        assert_eq!(MemberKind::Students.code_column(), "roll_no");
        assert_eq!(MemberKind::Teachers.table(), "teachers");
        let kind: MemberKind = serde_json::from_str("\"teachers\"").unwrap();
        assert_eq!(kind, MemberKind::Teachers);
        assert!(serde_json::from_str::<MemberKind>("\"admins\"").is_err());
    }
}
