use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::admin::{AdminProfile, ProfileUpdate};
use crate::models::alert::{Alert, AlertInput, AlertType};
use crate::models::booking::{BookingFilter, BookingRequest, BookingStatus};
use crate::models::classroom::{Classroom, Occupancy, OccupancyRepair};
use crate::models::dashboard::{Activity, DashboardStats};
use crate::models::user::{Member, MemberKind, NewMember};

use super::DirectoryStore;

const BOOKING_COLUMNS: &str =
    "id, requester_id, room, date, time_slot, purpose, status, created_at";

const ALERT_COLUMNS: &str =
    "id, title, description, type, start_date, end_date, file_url, posted_by, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Builds the pool without opening a connection; the first query connects.
    pub fn connect_lazy(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -- Alert Operations --

    pub async fn list_alerts(&self) -> anyhow::Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, Alert>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_alert(&self, input: &AlertInput, posted_by: Uuid) -> anyhow::Result<Alert> {
        let row = sqlx::query_as::<_, Alert>(&format!(
            r#"INSERT INTO alerts (title, description, type, start_date, end_date, file_url, posted_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {ALERT_COLUMNS}"#
        ))
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.r#type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.file_url)
        .bind(posted_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Replaces the editable fields. A missing `file_url` keeps the stored path.
    pub async fn update_alert(&self, id: Uuid, input: &AlertInput) -> anyhow::Result<Option<Alert>> {
        let row = sqlx::query_as::<_, Alert>(&format!(
            r#"UPDATE alerts
               SET title = $2, description = $3, type = $4, start_date = $5, end_date = $6,
                   file_url = COALESCE($7, file_url)
               WHERE id = $1
               RETURNING {ALERT_COLUMNS}"#
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.r#type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.file_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_alert(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Alerts that carry an attached file, optionally narrowed to one type.
    pub async fn list_documents(&self, kind: Option<AlertType>) -> anyhow::Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, Alert>(&format!(
            r#"SELECT {ALERT_COLUMNS} FROM alerts
               WHERE file_url IS NOT NULL AND file_url <> ''
                 AND ($1::varchar IS NULL OR type = $1)
               ORDER BY created_at DESC"#
        ))
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -- Admin Operations --

    pub async fn get_admin_by_email(&self, email: &str) -> anyhow::Result<Option<AdminProfile>> {
        let row = sqlx::query_as::<_, AdminProfile>(
            r#"SELECT id, email, name, office_name, department, campus, phone, role, profile_url, created_at
               FROM admins WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_admin_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Option<AdminProfile>> {
        let row = sqlx::query_as::<_, AdminProfile>(
            r#"UPDATE admins
               SET name = $2, office_name = $3, department = $4, campus = $5, phone = $6, profile_url = $7
               WHERE email = $1
               RETURNING id, email, name, office_name, department, campus, phone, role, profile_url, created_at"#,
        )
        .bind(email)
        .bind(&update.name)
        .bind(&update.office_name)
        .bind(&update.department)
        .bind(&update.campus)
        .bind(&update.phone)
        .bind(&update.profile_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // -- Member Operations --
    // Table and column names come from MemberKind, never from request input.

    pub async fn list_members(&self, kind: MemberKind) -> anyhow::Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, Member>(&format!(
            "SELECT id, {code} AS code, name, branch, email, status, created_at FROM {table} ORDER BY name ASC",
            code = kind.code_column(),
            table = kind.table(),
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_member(&self, kind: MemberKind, member: &NewMember) -> anyhow::Result<Member> {
        let row = sqlx::query_as::<_, Member>(&format!(
            r#"INSERT INTO {table} ({code}, name, branch, email, status)
               VALUES ($1, $2, $3, $4, 'Active')
               RETURNING id, {code} AS code, name, branch, email, status, created_at"#,
            code = kind.code_column(),
            table = kind.table(),
        ))
        .bind(&member.code)
        .bind(&member.name)
        .bind(&member.branch)
        .bind(&member.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_member(&self, kind: MemberKind, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flips Active/Inactive in one statement.
    pub async fn toggle_member_status(&self, kind: MemberKind, id: Uuid) -> anyhow::Result<Option<Member>> {
        let row = sqlx::query_as::<_, Member>(&format!(
            r#"UPDATE {table}
               SET status = CASE WHEN status = 'Active' THEN 'Inactive' ELSE 'Active' END
               WHERE id = $1
               RETURNING id, {code} AS code, name, branch, email, status, created_at"#,
            code = kind.code_column(),
            table = kind.table(),
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // -- Dashboard Operations --

    pub async fn dashboard_stats(&self) -> anyhow::Result<DashboardStats> {
        let stats = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"SELECT
                 (SELECT COUNT(*) FROM students) + (SELECT COUNT(*) FROM teachers),
                 (SELECT COUNT(*) FROM alerts),
                 (SELECT COUNT(*) FROM bookings WHERE status = 'Pending'),
                 (SELECT COUNT(*) FROM classrooms)"#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            users: stats.0,
            alerts: stats.1,
            pending_bookings: stats.2,
            classrooms: stats.3,
        })
    }

    pub async fn recent_activity(&self, alerts: i64, bookings: i64) -> anyhow::Result<Vec<Activity>> {
        let alert_rows = sqlx::query_as::<_, (String, chrono::DateTime<chrono::Utc>)>(
            "SELECT title, created_at FROM alerts ORDER BY created_at DESC LIMIT $1",
        )
        .bind(alerts)
        .fetch_all(&self.pool)
        .await?;

        let booking_rows = sqlx::query_as::<_, (String, String, String, chrono::DateTime<chrono::Utc>)>(
            "SELECT room, purpose, status, created_at FROM bookings ORDER BY created_at DESC LIMIT $1",
        )
        .bind(bookings)
        .fetch_all(&self.pool)
        .await?;

        let mut activity: Vec<Activity> = alert_rows
            .into_iter()
            .map(|(title, created_at)| Activity::Alert { title, created_at })
            .collect();
        activity.extend(booking_rows.into_iter().map(|(room, purpose, status, created_at)| {
            Activity::Booking {
                room,
                purpose,
                status,
                created_at,
            }
        }));
        Ok(activity)
    }

    // -- System Settings Operations --

    pub async fn get_system_setting<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> anyhow::Result<Option<T>> {
        let row = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT value FROM system_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(val) => Ok(Some(serde_json::from_value(val)?)),
            None => Ok(None),
        }
    }

    pub async fn set_system_setting<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        description: Option<&str>,
    ) -> anyhow::Result<()> {
        let json_val = serde_json::to_value(value)?;

        sqlx::query(
            r#"
            INSERT INTO system_settings (key, value, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value,
                description = COALESCE(EXCLUDED.description, system_settings.description),
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(json_val)
        .bind(description)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn list_bookings(&self, filter: BookingFilter) -> anyhow::Result<Vec<BookingRequest>> {
        let rows = sqlx::query_as::<_, BookingRequest>(&format!(
            r#"SELECT {BOOKING_COLUMNS} FROM bookings
               WHERE ($1::varchar IS NULL OR status = $1)
               ORDER BY created_at ASC, id ASC"#
        ))
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_booking(&self, id: Uuid) -> anyhow::Result<Option<BookingRequest>> {
        let row = sqlx::query_as::<_, BookingRequest>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_booking_status(&self, id: Uuid, status: BookingStatus) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_classrooms(&self) -> anyhow::Result<Vec<Classroom>> {
        let rows = sqlx::query_as::<_, Classroom>(
            "SELECT room_no, status FROM classrooms ORDER BY room_no ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn set_classroom_status(&self, room_no: &str, status: Occupancy) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE classrooms SET status = $1 WHERE room_no = $2")
            .bind(status)
            .bind(room_no)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_occupancy_repair(
        &self,
        booking_id: Uuid,
        room_no: &str,
        error: &str,
    ) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO occupancy_repairs (booking_id, room_no, last_error)
               VALUES ($1, $2, $3)
               RETURNING id"#,
        )
        .bind(booking_id)
        .bind(room_no)
        .bind(error)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn pending_occupancy_repairs(&self, limit: i64) -> anyhow::Result<Vec<OccupancyRepair>> {
        let rows = sqlx::query_as::<_, OccupancyRepair>(
            r#"SELECT id, booking_id, room_no, attempts, last_error, resolved_at, created_at
               FROM occupancy_repairs
               WHERE resolved_at IS NULL
               ORDER BY created_at ASC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn resolve_occupancy_repair(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE occupancy_repairs SET resolved_at = NOW(), attempts = attempts + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn note_repair_failure(&self, id: Uuid, error: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE occupancy_repairs SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
