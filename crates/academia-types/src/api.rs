use serde::{Deserialize, Serialize};

use crate::models::{Course, CourseVisit, Notification, NoticeLevel, Settings, StudentProfile, User};

// -- Notices --

/// Stand-in for a flash message: every redirect and validation failure
/// carries one of these in its body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub category_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: User,
    pub notice: Notice,
    /// Only present when the account was activated and logged in straight away.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

// -- Index --

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub settings: Settings,
    pub current_user: Option<User>,
    pub unread_notifications: i64,
    pub courses: Vec<Course>,
}

// -- Approvals --

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingRequestsResponse {
    pub pending: Vec<User>,
}

// -- Notifications --

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

// -- Courses --

#[derive(Debug, Default, Deserialize)]
pub struct CourseQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseViewResponse {
    pub course: Course,
    pub visits_count: i64,
    pub recent_visits: Vec<CourseVisit>,
}

// -- Profile --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub level: Option<String>,
    pub school: Option<String>,
    pub phone: Option<String>,
    /// `YYYY-MM-DD`
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: User,
    pub profile: Option<StudentProfile>,
}

// -- Settings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsUpdateRequest {
    pub platform_name: String,
    #[serde(default)]
    pub platform_description: String,
    #[serde(default)]
    pub support_email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub notice: Notice,
}
