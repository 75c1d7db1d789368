use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::info;

use academia_types::api::{Notice, ProfileResponse, ProfileUpdateRequest, UploadResponse};
use academia_types::models::NoticeLevel;

use crate::error::AppError;
use crate::files::read_file_field;
use crate::middleware::Identity;
use crate::state::{AppState, with_db};
use crate::validate::{self, optional_text};
use crate::views;

pub async fn get_profile(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ProfileResponse>, AppError> {
    load_profile(&state, identity.id()).await.map(Json)
}

/// POST /profile: rename and/or upsert the profile row.
///
/// Fields left out of the request keep their stored values; blank strings clear them.
pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user_id = identity.id();

    let name = req.name.as_deref().map(validate::name).transpose()?;
    let birth_date = match req.birth_date {
        Some(raw) if raw.trim().is_empty() => Some(None),
        Some(raw) => Some(Some(validate::birth_date(&raw)?.format("%Y-%m-%d").to_string())),
        None => None,
    };

    let fields = [req.level, req.school, req.phone, req.gender, req.city];
    let touches_profile = birth_date.is_some() || fields.iter().any(Option::is_some);
    let [level, school, phone, gender, city] = fields.map(|f| f.map(|v| optional_text(Some(v))));

    with_db(&state, move |db| {
        if let Some(name) = &name {
            db.update_user_name(user_id, name)?;
        }
        if touches_profile {
            let mut profile = db.get_student_profile(user_id)?.unwrap_or_default();
            merge(&mut profile.level, level);
            merge(&mut profile.school, school);
            merge(&mut profile.phone, phone);
            merge(&mut profile.birth_date, birth_date);
            merge(&mut profile.gender, gender);
            merge(&mut profile.city, city);
            db.upsert_student_profile(user_id, &profile)?;
        }
        Ok(())
    })
    .await?;

    info!("User {} updated their profile", user_id);
    load_profile(&state, user_id).await.map(Json)
}

/// POST /profile/upload: multipart form with an `image` field.
pub async fn upload_profile_image(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let (original_name, bytes) = read_file_field(&mut multipart, "image")
        .await?
        .ok_or_else(|| AppError::validation("Please choose a file."))?;

    let filename = state.storage.save_profile_image(identity.id(), &original_name, &bytes).await?;

    let user_id = identity.id();
    let stored = filename.clone();
    with_db(&state, move |db| db.set_profile_image(user_id, &stored)).await?;
    info!("User {} uploaded profile image '{}'", user_id, filename);

    Ok(Json(UploadResponse {
        filename,
        notice: Notice {
            level: NoticeLevel::Success,
            message: "Image uploaded.".into(),
            redirect: Some("/profile".into()),
        },
    }))
}

async fn load_profile(state: &AppState, user_id: i64) -> Result<ProfileResponse, AppError> {
    let (user, profile) = with_db(state, move |db| {
        let user = db.get_user_by_id(user_id)?;
        let profile = db.get_student_profile(user_id)?;
        Ok((user, profile))
    })
    .await?;

    Ok(ProfileResponse {
        user: views::user(user.ok_or(AppError::NotFound)?),
        profile: profile.map(views::student_profile),
    })
}

/// `None` leaves the field alone, `Some(v)` replaces it.
fn merge(field: &mut Option<String>, update: Option<Option<String>>) {
    if let Some(value) = update {
        *field = value;
    }
}
