use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use academia_types::api::{
    CourseQuery, CourseViewResponse, CreateCourseRequest, IndexResponse, Notice, UploadResponse,
};
use academia_types::models::{Course, NoticeLevel};

use crate::error::AppError;
use crate::files::read_file_field;
use crate::middleware::{CurrentUser, Identity};
use crate::state::{AppState, with_db};
use crate::validate::optional_text;
use crate::views;

pub const RECENT_VISITS: u32 = 10;

/// GET /: platform settings, the caller, their unread count and the newest courses.
pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<IndexResponse>, AppError> {
    let user_id = current.0.as_ref().map(Identity::id);

    let (settings, unread, courses) = with_db(&state, move |db| {
        let settings = db.get_settings()?;
        let unread = match user_id {
            Some(id) => db.unread_notification_count(id)?,
            None => 0,
        };
        let courses = db.list_courses(None, None)?;
        Ok((settings, unread, courses))
    })
    .await?;

    Ok(Json(IndexResponse {
        settings: views::settings(settings),
        current_user: current.0.map(|identity| identity.user),
        unread_notifications: unread,
        courses: courses.into_iter().map(views::course).collect(),
    }))
}

/// GET /courses?q=&category=
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseQuery>,
) -> Result<Json<Vec<Course>>, AppError> {
    let text = optional_text(query.q);
    let category = optional_text(query.category);

    let rows = with_db(&state, move |db| db.list_courses(text.as_deref(), category.as_deref())).await?;
    Ok(Json(rows.into_iter().map(views::course).collect()))
}

/// POST /add-course
pub async fn add_course(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::validation("Course title is required."));
    }
    let description = req.description.trim().to_string();
    let category = req.category.trim().to_string();
    let author_id = identity.id();

    let row = with_db(&state, move |db| {
        let id = db.insert_course(&title, &description, &category, author_id)?;
        db.get_course(id)?
            .ok_or_else(|| anyhow::anyhow!("course {} vanished after insert", id))
    })
    .await?;

    info!("User {} created course {}", author_id, row.id);
    Ok((StatusCode::CREATED, Json(views::course(row))))
}

/// POST /upload-course/{id}: multipart form with a `file` field.
pub async fn upload_course(
    State(state): State<AppState>,
    identity: Identity,
    Path(course_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    with_db(&state, move |db| db.get_course(course_id))
        .await?
        .ok_or(AppError::NotFound)?;

    let (original_name, bytes) = read_file_field(&mut multipart, "file")
        .await?
        .ok_or_else(|| AppError::validation("Please choose a file."))?;

    let filename = state.storage.save_course_file(course_id, &original_name, &bytes).await?;

    let stored = filename.clone();
    with_db(&state, move |db| db.set_course_file(course_id, &stored)).await?;

    info!(
        "User {} uploaded '{}' ({} bytes) for course {}",
        identity.id(),
        filename,
        bytes.len(),
        course_id
    );

    Ok(Json(UploadResponse {
        filename,
        notice: Notice {
            level: NoticeLevel::Success,
            message: "Course file uploaded.".into(),
            redirect: Some(format!("/course/{}", course_id)),
        },
    }))
}

/// GET /course/{id}: logs a visit on every call, then reports the totals.
pub async fn view_course(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<i64>,
) -> Result<Json<CourseViewResponse>, AppError> {
    let user_id = current.0.as_ref().map(Identity::id);

    let found = with_db(&state, move |db| {
        let Some(course) = db.get_course(course_id)? else {
            return Ok(None);
        };
        db.record_course_visit(course_id, user_id)?;
        let visits_count = db.course_visit_count(course_id)?;
        let recent = db.recent_course_visits(course_id, RECENT_VISITS)?;
        Ok(Some((course, visits_count, recent)))
    })
    .await?;

    let (course, visits_count, recent) = found.ok_or(AppError::NotFound)?;

    Ok(Json(CourseViewResponse {
        course: views::course(course),
        visits_count,
        recent_visits: recent.into_iter().map(views::course_visit).collect(),
    }))
}
