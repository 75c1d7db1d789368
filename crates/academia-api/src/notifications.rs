use axum::{
    Json,
    extract::{Path, State},
};
use tracing::warn;

use academia_types::api::NotificationsResponse;

use crate::error::{AppError, Redirect};
use crate::middleware::Identity;
use crate::state::{AppState, with_db};
use crate::views;

pub async fn list_notifications(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<NotificationsResponse>, AppError> {
    let user_id = identity.id();
    let rows = with_db(&state, move |db| db.list_notifications(user_id)).await?;
    Ok(Json(NotificationsResponse {
        notifications: rows.into_iter().map(views::notification).collect(),
    }))
}

/// GET /notifications/read/{id}: only the recipient may mark it read.
pub async fn mark_read(
    State(state): State<AppState>,
    identity: Identity,
    Path(notification_id): Path<i64>,
) -> Result<Redirect, AppError> {
    let notification = with_db(&state, move |db| db.get_notification(notification_id))
        .await?
        .ok_or(AppError::NotFound)?;

    if notification.user_id != identity.id() {
        warn!(
            "User {} tried to read notification {} owned by {}",
            identity.id(),
            notification_id,
            notification.user_id
        );
        return Ok(Redirect::danger("/notifications", "Not allowed."));
    }

    with_db(&state, move |db| db.mark_notification_read(notification_id)).await?;
    Ok(Redirect::success("/notifications", "Notification marked as read."))
}
