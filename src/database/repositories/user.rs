use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{ApprovalFilter, UpdateUserInput, User, UserFilter},
    utils::sql,
};

const USER_COLUMNS: &str = r#"
    id,
    username,
    email,
    password_hash,
    employee_number,
    full_name,
    gender,
    role,
    department_id,
    team_id,
    is_active,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(&sql(r#"
            INSERT INTO
                users (
                    id,
                    username,
                    email,
                    password_hash,
                    employee_number,
                    full_name,
                    gender,
                    role,
                    department_id,
                    team_id,
                    is_active,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.employee_number)
        .bind(&user.full_name)
        .bind(user.gender)
        .bind(user.role)
        .bind(user.department_id)
        .bind(user.team_id)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&sql(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&sql(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        )))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>(&sql("SELECT EXISTS (SELECT 1 FROM users WHERE username = ?)"))
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    pub async fn employee_number_exists(&self, employee_number: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(&sql(
            "SELECT EXISTS (SELECT 1 FROM users WHERE employee_number = ?)",
        ))
        .bind(employee_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// HR directory listing.
    pub async fn list(&self, filter: &UserFilter, limit: i64, offset: i64) -> Result<Vec<User>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE TRUE"
        ));

        if let Some(query) = &filter.query {
            let pattern = format!("%{}%", query);
            qb.push(" AND (username ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR full_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(role) = filter.role {
            qb.push(" AND role = ").push_bind(role);
        }
        if let Some(department_id) = filter.department_id {
            qb.push(" AND department_id = ").push_bind(department_id);
        }
        match filter.approval {
            Some(ApprovalFilter::Approved) => {
                qb.push(" AND is_active = TRUE");
            }
            Some(ApprovalFilter::Unapproved) => {
                qb.push(" AND is_active = FALSE");
            }
            None => {}
        }

        qb.push(" ORDER BY employee_number")
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(users)
    }

    /// Accounts still waiting for HR approval.
    pub async fn unapproved_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE is_active = FALSE",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn update(&self, id: Uuid, input: UpdateUserInput) -> Result<Option<User>> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&sql(&format!(
            r#"
            UPDATE
                users
            SET
                email = ?,
                employee_number = ?,
                full_name = ?,
                gender = ?,
                department_id = ?,
                team_id = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {USER_COLUMNS}
            "#
        )))
        .bind(input.email)
        .bind(input.employee_number)
        .bind(input.full_name)
        .bind(input.gender)
        .bind(input.department_id)
        .bind(input.team_id)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Flips an inactive account active. `Ok(false)` means it was already
    /// approved.
    pub async fn activate(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(&sql(
            "UPDATE users SET is_active = TRUE, updated_at = ? WHERE id = ? AND is_active = FALSE",
        ))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(&sql("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?"))
            .bind(password_hash)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<()>> {
        let result = sqlx::query(&sql("DELETE FROM users WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() > 0 {
            Some(())
        } else {
            None
        })
    }

    /// Ids of the departments and teams this user is the designated manager
    /// of; the authorization predicate is built from these.
    pub async fn managed_unit_ids(&self, user_id: Uuid) -> Result<(Vec<Uuid>, Vec<Uuid>)> {
        let departments =
            sqlx::query_scalar::<_, Uuid>(&sql("SELECT id FROM departments WHERE manager_id = ?"))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        let teams = sqlx::query_scalar::<_, Uuid>(&sql("SELECT id FROM teams WHERE manager_id = ?"))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok((departments, teams))
    }

    /// The manager of the given department, used to route submit
    /// notifications.
    pub async fn department_manager(&self, department_id: Uuid) -> Result<Option<Uuid>> {
        let manager_id = sqlx::query_scalar::<_, Option<Uuid>>(&sql(
            "SELECT manager_id FROM departments WHERE id = ?",
        ))
        .bind(department_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(manager_id.flatten())
    }

    /// Applicant's organizational placement, read under the workflow
    /// transaction so the manager-scope check and the transition see the
    /// same state.
    pub async fn unit_of_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<Option<(Option<Uuid>, Option<Uuid>)>> {
        let row = sqlx::query_as::<_, (Option<Uuid>, Option<Uuid>)>(&sql(
            "SELECT department_id, team_id FROM users WHERE id = ?",
        ))
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }
}
