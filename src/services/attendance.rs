use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{
    AttendanceFilter, AttendanceInput, AttendanceRecord, BreakRecord, DailyAttendanceEntry,
    SubmissionFilter, total_work_time,
};
use crate::database::repositories::AttendanceRepository;
use crate::error::AppError;
use crate::services::Outcome;
use crate::services::clock::Clock;

/// The day-to-day attendance ledger: punch operations for the signed-in
/// user, and HR-side maintenance guarded by the confirmed/read lock. Punch
/// operations run on a row-locked get-or-create of today's record so
/// concurrent duplicates fall into the warning branch.
#[derive(Clone)]
pub struct AttendanceService {
    pool: PgPool,
    attendance: AttendanceRepository,
    clock: Arc<dyn Clock>,
}

impl AttendanceService {
    pub fn new(pool: PgPool, attendance: AttendanceRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            attendance,
            clock,
        }
    }

    pub fn today(&self) -> chrono::NaiveDate {
        self.clock.today()
    }

    /// Today's record and the break in progress, if any.
    pub async fn dashboard(
        &self,
        user_id: Uuid,
    ) -> Result<(Option<AttendanceRecord>, Option<BreakRecord>), AppError> {
        let record = self
            .attendance
            .find_for_date(user_id, self.clock.today())
            .await?;

        let active_break = match &record {
            Some(record) => self.attendance.open_break(record.id).await?,
            None => None,
        };

        Ok((record, active_break))
    }

    pub async fn clock_in(&self, user_id: Uuid) -> Result<Outcome<AttendanceRecord>, AppError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut record = self
            .attendance
            .get_or_create_for_update(&mut tx, user_id, self.clock.today(), now)
            .await?;

        if record.clock_in.is_some() {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(Outcome::Blocked("Already clocked in."));
        }

        self.attendance.set_clock_in(&mut tx, record.id, now).await?;
        tx.commit().await.map_err(AppError::from)?;

        record.clock_in = Some(now);
        record.updated_at = now;
        Ok(Outcome::Applied(record))
    }

    pub async fn clock_out(&self, user_id: Uuid) -> Result<Outcome<AttendanceRecord>, AppError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut record = self
            .attendance
            .get_or_create_for_update(&mut tx, user_id, self.clock.today(), now)
            .await?;

        if record.clock_in.is_none() {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(Outcome::Blocked("Not clocked in yet."));
        }
        if record.clock_out.is_some() {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(Outcome::Blocked("Already clocked out."));
        }

        self.attendance.set_clock_out(&mut tx, record.id, now).await?;

        let breaks = self.attendance.breaks_in_tx(&mut tx, record.id).await?;
        let total = total_work_time(record.clock_in, Some(now), &breaks)
            .map(|duration| duration.num_seconds());
        self.attendance
            .set_total_work_seconds(&mut tx, record.id, total, now)
            .await?;

        tx.commit().await.map_err(AppError::from)?;

        record.clock_out = Some(now);
        record.total_work_seconds = total;
        record.updated_at = now;
        Ok(Outcome::Applied(record))
    }

    pub async fn start_break(&self, user_id: Uuid) -> Result<Outcome<BreakRecord>, AppError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let record = self
            .attendance
            .get_or_create_for_update(&mut tx, user_id, self.clock.today(), now)
            .await?;

        match self.attendance.start_break(&mut tx, record.id, now).await? {
            None => {
                tx.rollback().await.map_err(AppError::from)?;
                Ok(Outcome::Blocked("Already on a break."))
            }
            Some(break_record) => {
                tx.commit().await.map_err(AppError::from)?;
                Ok(Outcome::Applied(break_record))
            }
        }
    }

    pub async fn end_break(&self, user_id: Uuid) -> Result<Outcome<BreakRecord>, AppError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let record = self
            .attendance
            .get_or_create_for_update(&mut tx, user_id, self.clock.today(), now)
            .await?;

        match self.attendance.end_break(&mut tx, record.id, now).await? {
            None => {
                tx.rollback().await.map_err(AppError::from)?;
                Ok(Outcome::Blocked("No break in progress."))
            }
            Some(break_record) => {
                let breaks = self.attendance.breaks_in_tx(&mut tx, record.id).await?;
                let total = total_work_time(record.clock_in, record.clock_out, &breaks)
                    .map(|duration| duration.num_seconds());
                self.attendance
                    .set_total_work_seconds(&mut tx, record.id, total, now)
                    .await?;

                tx.commit().await.map_err(AppError::from)?;
                Ok(Outcome::Applied(break_record))
            }
        }
    }

    pub async fn update_note(
        &self,
        user_id: Uuid,
        note: &str,
    ) -> Result<AttendanceRecord, AppError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut record = self
            .attendance
            .get_or_create_for_update(&mut tx, user_id, self.clock.today(), now)
            .await?;

        self.attendance
            .update_note(&mut tx, record.id, note, now)
            .await?;
        tx.commit().await.map_err(AppError::from)?;

        record.note = note.to_string();
        record.updated_at = now;
        Ok(record)
    }

    pub async fn get_own_record(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<(AttendanceRecord, Vec<BreakRecord>), AppError> {
        let record = self
            .attendance
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))?;

        if record.user_id != user_id {
            return Err(AppError::forbidden("Not your attendance record."));
        }

        let breaks = self.attendance.breaks(record.id).await?;
        Ok((record, breaks))
    }

    pub async fn list_own(
        &self,
        user_id: Uuid,
        filter: &AttendanceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(self
            .attendance
            .list_for_user(user_id, filter, limit, offset)
            .await?)
    }

    pub async fn own_unread_count(&self, user_id: Uuid) -> Result<i64, AppError> {
        Ok(self.attendance.unread_count_for_user(user_id).await?)
    }

    // HR-side ledger maintenance.

    pub async fn hr_create(&self, input: AttendanceInput) -> Result<AttendanceRecord, AppError> {
        let total = total_work_time(input.clock_in, input.clock_out, &[])
            .map(|duration| duration.num_seconds());

        self.attendance
            .create_record(&input, total, self.clock.now())
            .await?
            .ok_or_else(|| {
                AppError::validation(
                    "An attendance record for that user and date already exists.",
                )
            })
    }

    pub async fn hr_get(
        &self,
        id: Uuid,
    ) -> Result<(AttendanceRecord, Vec<BreakRecord>), AppError> {
        let record = self
            .attendance
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))?;

        let breaks = self.attendance.breaks(record.id).await?;
        Ok((record, breaks))
    }

    /// Confirmed records are frozen; unmark first, then edit.
    pub async fn hr_update(
        &self,
        id: Uuid,
        input: AttendanceInput,
    ) -> Result<Outcome<AttendanceRecord>, AppError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let record = self
            .attendance
            .find_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))?;

        if record.is_read {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(Outcome::Blocked("A confirmed record cannot be edited."));
        }

        let breaks = self.attendance.breaks_in_tx(&mut tx, record.id).await?;
        let total = total_work_time(input.clock_in, input.clock_out, &breaks)
            .map(|duration| duration.num_seconds());

        let updated = self
            .attendance
            .update_record(&mut tx, id, &input, total, now)
            .await?;
        tx.commit().await.map_err(AppError::from)?;

        Ok(Outcome::Applied(updated))
    }

    pub async fn hr_delete(&self, id: Uuid) -> Result<Outcome<()>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let record = self
            .attendance
            .find_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))?;

        if record.is_read {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(Outcome::Blocked("A confirmed record cannot be deleted."));
        }

        self.attendance.delete_record(&mut tx, record.id).await?;
        tx.commit().await.map_err(AppError::from)?;

        Ok(Outcome::Applied(()))
    }

    pub async fn mark_read(&self, id: Uuid, reader_id: Uuid) -> Result<(), AppError> {
        self.ensure_exists(id).await?;
        self.attendance
            .mark_read(id, reader_id, self.clock.now())
            .await?;
        Ok(())
    }

    pub async fn unmark_read(&self, id: Uuid) -> Result<(), AppError> {
        self.ensure_exists(id).await?;
        self.attendance.unmark_read(id, self.clock.now()).await?;
        Ok(())
    }

    pub async fn hr_list(
        &self,
        filter: &AttendanceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(self.attendance.list_all(filter, limit, offset).await?)
    }

    pub async fn hr_unread_count(&self) -> Result<i64, AppError> {
        Ok(self.attendance.unread_count_all().await?)
    }

    pub async fn daily_overview(
        &self,
        managed_departments: &[Uuid],
        date: chrono::NaiveDate,
        submission: Option<SubmissionFilter>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DailyAttendanceEntry>, AppError> {
        Ok(self
            .attendance
            .daily_overview(managed_departments, date, submission, limit, offset)
            .await?)
    }

    pub async fn daily_unread_count(
        &self,
        managed_departments: &[Uuid],
        date: chrono::NaiveDate,
    ) -> Result<i64, AppError> {
        Ok(self
            .attendance
            .unread_count_for_departments(managed_departments, date)
            .await?)
    }

    async fn ensure_exists(&self, id: Uuid) -> Result<(), AppError> {
        self.attendance
            .find_by_id(id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))
    }
}
