use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::info;

use academia_types::api::{Notice, SettingsUpdateRequest, UploadResponse};
use academia_types::models::{NoticeLevel, Settings};

use crate::error::AppError;
use crate::files::read_file_field;
use crate::middleware::Identity;
use crate::state::{AppState, with_db};
use crate::{validate, views};

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, AppError> {
    let row = with_db(&state, |db| db.get_settings()).await?;
    Ok(Json(views::settings(row)))
}

/// POST /admin/settings: edits the singleton row.
pub async fn update_settings(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<SettingsUpdateRequest>,
) -> Result<Json<Settings>, AppError> {
    let name = req.platform_name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("Platform name is required."));
    }
    let description = req.platform_description.trim().to_string();
    let support_email = match req.support_email.trim() {
        "" => String::new(),
        raw => validate::email(raw)?,
    };

    let row = with_db(&state, move |db| {
        db.update_settings(&name, &description, &support_email)?;
        db.get_settings()
    })
    .await?;

    info!("User {} updated platform settings", identity.id());
    Ok(Json(views::settings(row)))
}

/// POST /admin/settings/logo: multipart form with a `logo` field.
pub async fn upload_logo(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let (original_name, bytes) = read_file_field(&mut multipart, "logo")
        .await?
        .ok_or_else(|| AppError::validation("Please choose a file."))?;

    let filename = state.storage.save_logo(&original_name, &bytes).await?;

    let stored = filename.clone();
    with_db(&state, move |db| db.set_settings_logo(&stored)).await?;
    info!("User {} replaced the platform logo with '{}'", identity.id(), filename);

    Ok(Json(UploadResponse {
        filename,
        notice: Notice {
            level: NoticeLevel::Success,
            message: "Logo uploaded.".into(),
            redirect: Some("/admin/settings".into()),
        },
    }))
}
