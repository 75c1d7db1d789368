use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::error;

use academia_db::DbError;
use academia_types::api::Notice;
use academia_types::models::NoticeLevel;

/// A `303 See Other` carrying a notice, the JSON stand-in for
/// "redirect and flash a message".
#[derive(Debug, Clone)]
pub struct Redirect {
    pub to: String,
    pub level: NoticeLevel,
    pub message: String,
}

impl Redirect {
    pub fn new(to: impl Into<String>, level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            level,
            message: message.into(),
        }
    }

    pub fn success(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(to, NoticeLevel::Success, message)
    }

    pub fn warning(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(to, NoticeLevel::Warning, message)
    }

    pub fn danger(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(to, NoticeLevel::Danger, message)
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let notice = Notice {
            level: self.level,
            message: self.message,
            redirect: Some(self.to.clone()),
        };
        (StatusCode::SEE_OTHER, [(header::LOCATION, self.to)], Json(notice)).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad form input. Nothing was written.
    #[error("{0}")]
    Validation(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    /// Authorization failures never surface as hard errors.
    #[error("{}", .0.message)]
    Redirect(Redirect),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DbError>() {
            Some(DbError::DuplicateEmail(_)) => {
                AppError::Validation("Email address is already registered.".into())
            }
            None => AppError::Internal(err),
        }
    }
}

impl From<Redirect> for AppError {
    fn from(redirect: Redirect) -> Self {
        AppError::Redirect(redirect)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, level, message) = match self {
            AppError::Redirect(redirect) => return redirect.into_response(),
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, NoticeLevel::Danger, message),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                NoticeLevel::Danger,
                "Invalid email or password.".to_string(),
            ),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, NoticeLevel::Warning, message),
            AppError::NotFound => (StatusCode::NOT_FOUND, NoticeLevel::Danger, "Not found.".to_string()),
            AppError::Internal(err) => {
                error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    NoticeLevel::Danger,
                    "Internal server error.".to_string(),
                )
            }
        };

        let notice = Notice {
            level,
            message,
            redirect: None,
        };
        (status, Json(notice)).into_response()
    }
}
