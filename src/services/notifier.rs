use anyhow::Result;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::database::models::NotificationInput;
use crate::database::repositories::NotificationRepository;
use crate::services::clock::Clock;

/// How long a cached unread count may lag behind the log. Clients poll the
/// count on every page load, so this is the one read worth shielding.
const UNREAD_COUNT_TTL: Duration = Duration::from_secs(30);

/// Append-only notification log. Emission is fire-and-forget: a failed
/// insert is logged and never propagated, so it cannot fail or roll back
/// the workflow transition that triggered it.
#[derive(Clone)]
pub struct Notifier {
    repository: NotificationRepository,
    unread_counts: Cache<Uuid, i64>,
    clock: Arc<dyn Clock>,
}

impl Notifier {
    pub fn new(repository: NotificationRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            unread_counts: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(UNREAD_COUNT_TTL)
                .build(),
            clock,
        }
    }

    pub async fn send(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        message: String,
        link: Option<String>,
    ) {
        let input = NotificationInput {
            sender_id,
            recipient_id,
            message,
            link,
        };

        match self.repository.create(&input, self.clock.now()).await {
            Ok(_) => self.unread_counts.invalidate(&recipient_id).await,
            Err(err) => {
                log::warn!(
                    "Failed to record notification for recipient {}: {}",
                    recipient_id,
                    err
                );
            }
        }
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64> {
        if let Some(count) = self.unread_counts.get(&recipient_id).await {
            return Ok(count);
        }

        let count = self.repository.unread_count(recipient_id).await?;
        self.unread_counts.insert(recipient_id, count).await;
        Ok(count)
    }

    /// Called when the recipient reads or deletes a notification through
    /// the repository directly.
    pub async fn invalidate_count(&self, recipient_id: Uuid) {
        self.unread_counts.invalidate(&recipient_id).await;
    }
}
