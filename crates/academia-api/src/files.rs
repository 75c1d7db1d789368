use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::error::AppError;

pub const COURSE_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "pdf"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// The three upload folders. Each accepts its own fixed set of extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Courses,
    ProfileImages,
    SettingsAssets,
}

impl Folder {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            Folder::Courses => COURSE_EXTENSIONS,
            Folder::ProfileImages | Folder::SettingsAssets => IMAGE_EXTENSIONS,
        }
    }
}

/// On-disk storage for uploaded files.
///
/// Names are sanitized and scoped to their owner (course or user); a second
/// upload with the same name for the same owner replaces the first.
pub struct Storage {
    courses: PathBuf,
    profile_images: PathBuf,
    settings_assets: PathBuf,
}

impl Storage {
    pub async fn new(courses: PathBuf, profile_images: PathBuf, settings_assets: PathBuf) -> anyhow::Result<Self> {
        for dir in [&courses, &profile_images, &settings_assets] {
            tokio::fs::create_dir_all(dir).await?;
            info!("Upload directory: {}", dir.display());
        }
        Ok(Self {
            courses,
            profile_images,
            settings_assets,
        })
    }

    pub fn dir(&self, folder: Folder) -> &Path {
        match folder {
            Folder::Courses => &self.courses,
            Folder::ProfileImages => &self.profile_images,
            Folder::SettingsAssets => &self.settings_assets,
        }
    }

    /// Course files live in one subfolder per course, so two courses can
    /// carry the same filename. Returns the sanitized filename.
    pub async fn save_course_file(&self, course_id: i64, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        let filename = checked_name(Folder::Courses, original_name, bytes)?;
        let dir = self.courses.join(course_id.to_string());
        write_file(&dir, &filename, bytes).await?;
        Ok(filename)
    }

    /// Profile images are prefixed with the owner's id. Returns the stored name.
    pub async fn save_profile_image(&self, user_id: i64, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        let filename = format!("{}_{}", user_id, checked_name(Folder::ProfileImages, original_name, bytes)?);
        write_file(&self.profile_images, &filename, bytes).await?;
        Ok(filename)
    }

    pub async fn save_logo(&self, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        let filename = checked_name(Folder::SettingsAssets, original_name, bytes)?;
        write_file(&self.settings_assets, &filename, bytes).await?;
        Ok(filename)
    }
}

/// Validation happens before anything touches the disk.
fn checked_name(folder: Folder, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    if original_name.trim().is_empty() || bytes.is_empty() {
        return Err(AppError::validation("Please choose a file."));
    }

    let filename = sanitize_filename(original_name);
    if !is_allowed(&filename, folder.allowed_extensions()) {
        return Err(AppError::validation(format!(
            "File type not allowed. Accepted: {}.",
            folder.allowed_extensions().join(", ")
        )));
    }
    Ok(filename)
}

async fn write_file(dir: &Path, filename: &str, bytes: &[u8]) -> Result<(), AppError> {
    let file_path = dir.join(filename);
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        let mut file = tokio::fs::File::create(&file_path).await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    result.map_err(|e| {
        error!("Failed to write file {}: {}", file_path.display(), e);
        AppError::Internal(e.into())
    })
}

/// Reduce a client-supplied filename to something safe to join onto a folder:
/// directory parts dropped, whitespace turned into `_`, anything outside
/// `[A-Za-z0-9._-]` removed, leading dots and underscores trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut out = String::with_capacity(base.len());
    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
        } else if ch.is_whitespace() {
            out.push('_');
        }
    }

    out.trim_start_matches(['.', '_']).to_string()
}

/// Lowercased extension after the last dot, if any.
pub fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_allowed(filename: &str, allowed: &[&str]) -> bool {
    extension(filename).is_some_and(|ext| allowed.contains(&ext.as_str()))
}

/// Pull the named file field out of a multipart form.
/// Returns `None` when the form has no such field.
pub async fn read_file_field(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Option<(String, Bytes)>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Malformed upload: {}", e)))?;
        return Ok(Some((filename, bytes)));
    }
    Ok(None)
}
