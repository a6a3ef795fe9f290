use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{Notification, NotificationInput},
    utils::sql,
};

const NOTIFICATION_COLUMNS: &str = r#"
    id,
    sender_id,
    recipient_id,
    message,
    link,
    is_read,
    created_at
"#;

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        input: &NotificationInput,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(&sql(&format!(
            r#"
            INSERT INTO
                notifications (sender_id, recipient_id, message, link, created_at)
            VALUES
                (?, ?, ?, ?, ?)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        )))
        .bind(input.sender_id)
        .bind(input.recipient_id)
        .bind(&input.message)
        .bind(&input.link)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    pub async fn list_for_recipient(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&sql(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE recipient_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#
        )))
        .bind(recipient_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// Marks one of the recipient's own notifications read. `false` means
    /// no such notification belongs to them.
    pub async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<bool> {
        let result = sqlx::query(&sql(
            "UPDATE notifications SET is_read = TRUE WHERE id = ? AND recipient_id = ?",
        ))
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recipient-only delete.
    pub async fn delete(&self, id: Uuid, recipient_id: Uuid) -> Result<bool> {
        let result = sqlx::query(&sql(
            "DELETE FROM notifications WHERE id = ? AND recipient_id = ?",
        ))
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(&sql(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND is_read = FALSE",
        ))
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
