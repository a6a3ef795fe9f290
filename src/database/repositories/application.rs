use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Application, ApplicationFilter, ApplicationInput, ApplicationStatus},
    utils::sql,
};

const APPLICATION_COLUMNS: &str = r#"
    id,
    applicant_id,
    application_type,
    start_at,
    end_at,
    reason,
    status,
    manager_approver_id,
    manager_approved_at,
    hr_approver_id,
    hr_approved_at,
    rejection_reason,
    created_at,
    updated_at
"#;

// Same columns qualified for queries that join users.
const JOINED_COLUMNS: &str = r#"
    a.id,
    a.applicant_id,
    a.application_type,
    a.start_at,
    a.end_at,
    a.reason,
    a.status,
    a.manager_approver_id,
    a.manager_approved_at,
    a.hr_approver_id,
    a.hr_approved_at,
    a.rejection_reason,
    a.created_at,
    a.updated_at
"#;

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn day_after(date: NaiveDate) -> DateTime<Utc> {
    day_start(date + chrono::Duration::days(1))
}

/// Inclusive calendar-date bounds applied to `start_at`, the one convention
/// used by every application list view.
fn push_date_bounds(qb: &mut QueryBuilder<'_, Postgres>, filter: &ApplicationFilter) {
    if let Some(start_date) = filter.start_date {
        qb.push(" AND a.start_at >= ").push_bind(day_start(start_date));
    }
    if let Some(end_date) = filter.end_date {
        qb.push(" AND a.start_at < ").push_bind(day_after(end_date));
    }
}

fn push_common_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ApplicationFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND a.status = ").push_bind(status);
    }
    if let Some(application_type) = filter.application_type {
        qb.push(" AND a.application_type = ").push_bind(application_type);
    }
    push_date_bounds(qb, filter);
    if let Some(name) = &filter.applicant_name {
        qb.push(" AND u.full_name ILIKE ")
            .push_bind(format!("%{}%", name));
    }
}

#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        applicant_id: Uuid,
        input: &ApplicationInput,
        now: DateTime<Utc>,
    ) -> Result<Application> {
        let application = sqlx::query_as::<_, Application>(&sql(&format!(
            r#"
            INSERT INTO
                applications (
                    applicant_id,
                    application_type,
                    start_at,
                    end_at,
                    reason,
                    status,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {APPLICATION_COLUMNS}
            "#
        )))
        .bind(applicant_id)
        .bind(input.application_type)
        .bind(input.start_at)
        .bind(input.end_at)
        .bind(&input.reason)
        .bind(ApplicationStatus::PendingManager)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(application)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>> {
        let application = sqlx::query_as::<_, Application>(&sql(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(application)
    }

    /// Row-locked read used by every transition so a concurrent duplicate
    /// request observes the committed state and takes the warning branch.
    pub async fn find_by_id_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Application>> {
        let application = sqlx::query_as::<_, Application>(&sql(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ? FOR UPDATE"
        )))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(application)
    }

    /// Writes back the fields the state machine mutates.
    pub async fn persist_transition(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        application: &Application,
    ) -> Result<()> {
        sqlx::query(&sql(r#"
            UPDATE
                applications
            SET
                status = ?,
                manager_approver_id = ?,
                manager_approved_at = ?,
                hr_approver_id = ?,
                hr_approved_at = ?,
                rejection_reason = ?,
                updated_at = ?
            WHERE
                id = ?
        "#))
        .bind(application.status)
        .bind(application.manager_approver_id)
        .bind(application.manager_approved_at)
        .bind(application.hr_approver_id)
        .bind(application.hr_approved_at)
        .bind(&application.rejection_reason)
        .bind(application.updated_at)
        .bind(application.id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Requester-side edit of an application still in manager review; the
    /// guard is checked by the caller under the same transaction.
    pub async fn update_content(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: &ApplicationInput,
        now: DateTime<Utc>,
    ) -> Result<Application> {
        let application = sqlx::query_as::<_, Application>(&sql(&format!(
            r#"
            UPDATE
                applications
            SET
                application_type = ?,
                start_at = ?,
                end_at = ?,
                reason = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {APPLICATION_COLUMNS}
            "#
        )))
        .bind(input.application_type)
        .bind(input.start_at)
        .bind(input.end_at)
        .bind(&input.reason)
        .bind(now)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(application)
    }

    pub async fn delete(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<()> {
        sqlx::query(&sql("DELETE FROM applications WHERE id = ?"))
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub async fn list_for_applicant(
        &self,
        applicant_id: Uuid,
        filter: &ApplicationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Application>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {JOINED_COLUMNS} FROM applications a WHERE a.applicant_id = "
        ));
        qb.push_bind(applicant_id);
        if let Some(status) = filter.status {
            qb.push(" AND a.status = ").push_bind(status);
        }
        if let Some(application_type) = filter.application_type {
            qb.push(" AND a.application_type = ").push_bind(application_type);
        }
        push_date_bounds(&mut qb, filter);

        qb.push(" ORDER BY a.start_at DESC")
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let applications = qb
            .build_query_as::<Application>()
            .fetch_all(&self.pool)
            .await?;

        Ok(applications)
    }

    /// Applications whose applicant belongs to one of the actor's managed
    /// departments or teams, never the actor's own.
    pub async fn list_for_manager(
        &self,
        managed_departments: &[Uuid],
        managed_teams: &[Uuid],
        actor_id: Uuid,
        filter: &ApplicationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Application>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT {JOINED_COLUMNS}
            FROM applications a
            INNER JOIN users u ON a.applicant_id = u.id
            WHERE (u.department_id = ANY(
            "#
        ));
        qb.push_bind(managed_departments.to_vec())
            .push(") OR u.team_id = ANY(")
            .push_bind(managed_teams.to_vec())
            .push(")) AND a.applicant_id <> ")
            .push_bind(actor_id);

        push_common_filters(&mut qb, filter);

        qb.push(" ORDER BY a.status, a.created_at DESC")
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let applications = qb
            .build_query_as::<Application>()
            .fetch_all(&self.pool)
            .await?;

        Ok(applications)
    }

    /// HR review queue: everything that has reached HR or finished.
    pub async fn list_for_hr(
        &self,
        filter: &ApplicationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Application>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT {JOINED_COLUMNS}
            FROM applications a
            INNER JOIN users u ON a.applicant_id = u.id
            WHERE a.status IN ('pending_hr', 'approved', 'rejected')
            "#
        ));

        push_common_filters(&mut qb, filter);

        qb.push(" ORDER BY a.created_at DESC")
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let applications = qb
            .build_query_as::<Application>()
            .fetch_all(&self.pool)
            .await?;

        Ok(applications)
    }
}
