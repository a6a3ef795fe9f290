use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::database::repositories::NotificationRepository;
use crate::error::AppError;
use crate::handlers::shared::{ApiResponse, page_bounds};
use crate::services::auth::Claims;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountData {
    pub unread_count: i64,
}

pub async fn get_notifications(
    claims: Claims,
    notifications: web::Data<NotificationRepository>,
    query: web::Query<NotificationListQuery>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = page_bounds(query.page, query.per_page);
    let listed = notifications
        .list_for_recipient(claims.sub, limit, offset)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(listed)))
}

/// Clients poll this on every page load; the count is served from a
/// short-lived cache.
pub async fn get_unread_count(
    claims: Claims,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let unread_count = state.notifier.unread_count(claims.sub).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(UnreadCountData { unread_count })))
}

pub async fn mark_notification_read(
    claims: Claims,
    notifications: web::Data<NotificationRepository>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let marked = notifications.mark_read(path.into_inner(), claims.sub).await?;
    if !marked {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    state.notifier.invalidate_count(claims.sub).await;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Notification marked read.",
    )))
}

/// Recipients may delete their own notifications; nobody else can.
pub async fn delete_notification(
    claims: Claims,
    notifications: web::Data<NotificationRepository>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let deleted = notifications.delete(path.into_inner(), claims.sub).await?;
    if !deleted {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    state.notifier.invalidate_count(claims.sub).await;
    Ok(HttpResponse::NoContent().finish())
}
