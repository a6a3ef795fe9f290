use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{
        AttendanceFilter, AttendanceInput, AttendanceRecord, BreakRecord, DailyAttendanceEntry,
        ReadStatusFilter, SubmissionFilter, UserRole,
    },
    utils::sql,
};

const ATTENDANCE_COLUMNS: &str = r#"
    id,
    user_id,
    date,
    clock_in,
    clock_out,
    total_work_seconds,
    note,
    is_read,
    read_by,
    read_at,
    created_at,
    updated_at
"#;

const JOINED_COLUMNS: &str = r#"
    a.id,
    a.user_id,
    a.date,
    a.clock_in,
    a.clock_out,
    a.total_work_seconds,
    a.note,
    a.is_read,
    a.read_by,
    a.read_at,
    a.created_at,
    a.updated_at
"#;

const BREAK_COLUMNS: &str = r#"
    id,
    attendance_id,
    start_time,
    end_time,
    created_at
"#;

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE user_id = ? AND date = ?"
        )))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Get-or-create of the day's record, returned row-locked. The unique
    /// (user_id, date) constraint absorbs the insert race; both contenders
    /// then queue on the row lock.
    pub async fn get_or_create_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        sqlx::query(&sql(r#"
            INSERT INTO
                attendance_records (user_id, date, created_at, updated_at)
            VALUES
                (?, ?, ?, ?)
            ON CONFLICT (user_id, date) DO NOTHING
        "#))
        .bind(user_id)
        .bind(date)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            r#"
            SELECT {ATTENDANCE_COLUMNS}
            FROM attendance_records
            WHERE user_id = ? AND date = ?
            FOR UPDATE
            "#
        )))
        .bind(user_id)
        .bind(date)
        .fetch_one(&mut **tx)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE id = ? FOR UPDATE"
        )))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(record)
    }

    pub async fn set_clock_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(&sql(
            "UPDATE attendance_records SET clock_in = ?, updated_at = ? WHERE id = ?",
        ))
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn set_clock_out(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(&sql(
            "UPDATE attendance_records SET clock_out = ?, updated_at = ? WHERE id = ?",
        ))
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn set_total_work_seconds(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        total_work_seconds: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(&sql(
            "UPDATE attendance_records SET total_work_seconds = ?, updated_at = ? WHERE id = ?",
        ))
        .bind(total_work_seconds)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn update_note(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(&sql(
            "UPDATE attendance_records SET note = ?, updated_at = ? WHERE id = ?",
        ))
        .bind(note)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn breaks(&self, attendance_id: Uuid) -> Result<Vec<BreakRecord>> {
        let breaks = sqlx::query_as::<_, BreakRecord>(&sql(&format!(
            "SELECT {BREAK_COLUMNS} FROM break_records WHERE attendance_id = ? ORDER BY start_time"
        )))
        .bind(attendance_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(breaks)
    }

    pub async fn breaks_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        attendance_id: Uuid,
    ) -> Result<Vec<BreakRecord>> {
        let breaks = sqlx::query_as::<_, BreakRecord>(&sql(&format!(
            "SELECT {BREAK_COLUMNS} FROM break_records WHERE attendance_id = ? ORDER BY start_time"
        )))
        .bind(attendance_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(breaks)
    }

    pub async fn open_break(&self, attendance_id: Uuid) -> Result<Option<BreakRecord>> {
        let open = sqlx::query_as::<_, BreakRecord>(&sql(&format!(
            "SELECT {BREAK_COLUMNS} FROM break_records WHERE attendance_id = ? AND end_time IS NULL"
        )))
        .bind(attendance_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(open)
    }

    /// Opens a break. The partial unique index on open breaks turns a lost
    /// race into a clean `None` instead of a second open row.
    pub async fn start_break(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        attendance_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<BreakRecord>> {
        let inserted = sqlx::query_as::<_, BreakRecord>(&sql(&format!(
            r#"
            INSERT INTO
                break_records (attendance_id, start_time, created_at)
            VALUES
                (?, ?, ?)
            ON CONFLICT (attendance_id) WHERE end_time IS NULL DO NOTHING
            RETURNING {BREAK_COLUMNS}
            "#
        )))
        .bind(attendance_id)
        .bind(now)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(inserted)
    }

    /// Closes the open break if there is one.
    pub async fn end_break(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        attendance_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<BreakRecord>> {
        let closed = sqlx::query_as::<_, BreakRecord>(&sql(&format!(
            r#"
            UPDATE
                break_records
            SET
                end_time = ?
            WHERE
                attendance_id = ?
                AND end_time IS NULL
            RETURNING {BREAK_COLUMNS}
            "#
        )))
        .bind(now)
        .bind(attendance_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(closed)
    }

    /// HR-side creation of a full record. `None` means the (user, date) pair
    /// already exists.
    pub async fn create_record(
        &self,
        input: &AttendanceInput,
        total_work_seconds: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            r#"
            INSERT INTO
                attendance_records (
                    user_id,
                    date,
                    clock_in,
                    clock_out,
                    total_work_seconds,
                    note,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, date) DO NOTHING
            RETURNING {ATTENDANCE_COLUMNS}
            "#
        )))
        .bind(input.user_id)
        .bind(input.date)
        .bind(input.clock_in)
        .bind(input.clock_out)
        .bind(total_work_seconds)
        .bind(&input.note)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn update_record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: &AttendanceInput,
        total_work_seconds: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            r#"
            UPDATE
                attendance_records
            SET
                clock_in = ?,
                clock_out = ?,
                total_work_seconds = ?,
                note = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {ATTENDANCE_COLUMNS}
            "#
        )))
        .bind(input.clock_in)
        .bind(input.clock_out)
        .bind(total_work_seconds)
        .bind(&input.note)
        .bind(now)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(record)
    }

    pub async fn delete_record(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<()> {
        sqlx::query(&sql("DELETE FROM attendance_records WHERE id = ?"))
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub async fn mark_read(&self, id: Uuid, reader_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(&sql(r#"
            UPDATE
                attendance_records
            SET
                is_read = TRUE,
                read_by = ?,
                read_at = ?,
                updated_at = ?
            WHERE
                id = ?
        "#))
        .bind(reader_id)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn unmark_read(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(&sql(r#"
            UPDATE
                attendance_records
            SET
                is_read = FALSE,
                read_by = NULL,
                read_at = NULL,
                updated_at = ?
            WHERE
                id = ?
        "#))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &AttendanceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttendanceRecord>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE user_id = "
        ));
        qb.push_bind(user_id);
        push_record_filters(&mut qb, filter, false);

        qb.push(" ORDER BY date DESC")
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let records = qb
            .build_query_as::<AttendanceRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    pub async fn unread_count_for_user(&self, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(&sql(
            "SELECT COUNT(*) FROM attendance_records WHERE user_id = ? AND is_read = FALSE",
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// HR ledger listing across all users.
    pub async fn list_all(
        &self,
        filter: &AttendanceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttendanceRecord>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT {JOINED_COLUMNS}
            FROM attendance_records a
            INNER JOIN users u ON a.user_id = u.id
            WHERE TRUE
            "#
        ));
        if let Some(query) = &filter.query {
            let pattern = format!("%{}%", query);
            qb.push(" AND (u.username ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.full_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        push_record_filters(&mut qb, filter, true);

        qb.push(" ORDER BY a.date DESC")
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let records = qb
            .build_query_as::<AttendanceRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    pub async fn unread_count_all(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance_records WHERE is_read = FALSE",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// The manager overview: employees of the managed departments paired
    /// with their record for the selected date.
    pub async fn daily_overview(
        &self,
        managed_departments: &[Uuid],
        date: NaiveDate,
        submission: Option<SubmissionFilter>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DailyAttendanceEntry>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, employee_number, full_name FROM users u WHERE u.department_id = ANY(",
        );
        qb.push_bind(managed_departments.to_vec())
            .push(") AND u.role = ")
            .push_bind(UserRole::Employee);

        match submission {
            Some(SubmissionFilter::Submitted) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM attendance_records a WHERE a.user_id = u.id AND a.date = ",
                )
                .push_bind(date)
                .push(")");
            }
            Some(SubmissionFilter::Unsubmitted) => {
                qb.push(
                    " AND NOT EXISTS (SELECT 1 FROM attendance_records a WHERE a.user_id = u.id AND a.date = ",
                )
                .push_bind(date)
                .push(")");
            }
            None => {}
        }

        qb.push(" ORDER BY employee_number")
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let members = qb
            .build_query_as::<(Uuid, String, String)>()
            .fetch_all(&self.pool)
            .await?;

        let user_ids: Vec<Uuid> = members.iter().map(|(id, _, _)| *id).collect();
        let records = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE user_id = ANY(?) AND date = ?"
        )))
        .bind(&user_ids)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        let entries = members
            .into_iter()
            .map(|(user_id, employee_number, full_name)| DailyAttendanceEntry {
                user_id,
                employee_number,
                full_name,
                record: records.iter().find(|r| r.user_id == user_id).cloned(),
            })
            .collect();

        Ok(entries)
    }

    pub async fn unread_count_for_departments(
        &self,
        managed_departments: &[Uuid],
        date: NaiveDate,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(&sql(r#"
            SELECT
                COUNT(*)
            FROM
                attendance_records a
                INNER JOIN users u ON a.user_id = u.id
            WHERE
                u.department_id = ANY(?)
                AND a.date = ?
                AND a.is_read = FALSE
        "#))
        .bind(managed_departments.to_vec())
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Shared date-range and read-status criteria; `joined` switches to the
/// alias used by the users join.
fn push_record_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AttendanceFilter, joined: bool) {
    let col = if joined { "a." } else { "" };

    if let Some(start_date) = filter.start_date {
        qb.push(format!(" AND {col}date >= ")).push_bind(start_date);
    }
    if let Some(end_date) = filter.end_date {
        qb.push(format!(" AND {col}date <= ")).push_bind(end_date);
    }
    match filter.read_status {
        Some(ReadStatusFilter::Read) => {
            qb.push(format!(" AND {col}is_read = TRUE"));
        }
        Some(ReadStatusFilter::Unread) => {
            qb.push(format!(" AND {col}is_read = FALSE"));
        }
        None => {}
    }
}
