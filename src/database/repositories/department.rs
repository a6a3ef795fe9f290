use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{Department, DepartmentInput},
    utils::sql,
};

#[derive(Clone)]
pub struct DepartmentRepository {
    pool: PgPool,
}

impl DepartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: DepartmentInput) -> Result<Department> {
        let now = Utc::now();
        let department = sqlx::query_as::<_, Department>(&sql(r#"
            INSERT INTO
                departments (name, manager_id, created_at, updated_at)
            VALUES
                (?, ?, ?, ?)
            RETURNING
                id,
                name,
                manager_id,
                created_at,
                updated_at
        "#))
        .bind(input.name)
        .bind(input.manager_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(department)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Department>> {
        let department = sqlx::query_as::<_, Department>(&sql(r#"
            SELECT
                id,
                name,
                manager_id,
                created_at,
                updated_at
            FROM
                departments
            WHERE
                id = ?
        "#))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    pub async fn list(&self) -> Result<Vec<Department>> {
        let departments = sqlx::query_as::<_, Department>(
            r#"
            SELECT
                id,
                name,
                manager_id,
                created_at,
                updated_at
            FROM
                departments
            ORDER BY
                created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(departments)
    }

    pub async fn update(&self, id: Uuid, input: DepartmentInput) -> Result<Option<Department>> {
        let now = Utc::now();
        let department = sqlx::query_as::<_, Department>(&sql(r#"
            UPDATE
                departments
            SET
                name = ?,
                manager_id = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING
                id,
                name,
                manager_id,
                created_at,
                updated_at
        "#))
        .bind(input.name)
        .bind(input.manager_id)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<()>> {
        let result = sqlx::query(&sql("DELETE FROM departments WHERE id = ?"))
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
