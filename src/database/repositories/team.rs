use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{Team, TeamInput},
    utils::sql,
};

#[derive(Clone)]
pub struct TeamRepository {
    pool: PgPool,
}

impl TeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: TeamInput) -> Result<Team> {
        let now = Utc::now();
        let team = sqlx::query_as::<_, Team>(&sql(r#"
            INSERT INTO
                teams (department_id, name, manager_id, created_at, updated_at)
            VALUES
                (?, ?, ?, ?, ?)
            RETURNING
                id,
                department_id,
                name,
                manager_id,
                created_at,
                updated_at
        "#))
        .bind(input.department_id)
        .bind(input.name)
        .bind(input.manager_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(team)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(&sql(r#"
            SELECT
                id,
                department_id,
                name,
                manager_id,
                created_at,
                updated_at
            FROM
                teams
            WHERE
                id = ?
        "#))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    pub async fn list(&self) -> Result<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT
                id,
                department_id,
                name,
                manager_id,
                created_at,
                updated_at
            FROM
                teams
            ORDER BY
                created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(teams)
    }

    pub async fn update(&self, id: Uuid, input: TeamInput) -> Result<Option<Team>> {
        let now = Utc::now();
        let team = sqlx::query_as::<_, Team>(&sql(r#"
            UPDATE
                teams
            SET
                department_id = ?,
                name = ?,
                manager_id = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING
                id,
                department_id,
                name,
                manager_id,
                created_at,
                updated_at
        "#))
        .bind(input.department_id)
        .bind(input.name)
        .bind(input.manager_id)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<()>> {
        let result = sqlx::query(&sql("DELETE FROM teams WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() > 0 {
            Some(())
        } else {
            None
        })
    }
}
