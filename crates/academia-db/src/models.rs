//! Row types as they come out of SQLite. Conversion to the public
//! models lives in the api crate.

use academia_types::models::Role;

pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub is_admin: bool,
    pub is_developer: bool,
    pub is_active: bool,
    pub pending_approval: bool,
    pub profile_image: Option<String>,
    pub created_at: String,
}

impl UserRow {
    /// Effective role: the flags win over the category.
    pub fn role(&self) -> Role {
        if self.is_developer {
            Role::Developer
        } else if self.is_admin {
            Role::Admin
        } else {
            self.category_name
                .as_deref()
                .map(Role::from_category_name)
                .unwrap_or(Role::Student)
        }
    }
}

/// Input for a user insert.
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub category_id: Option<i64>,
    pub is_admin: bool,
    pub is_developer: bool,
    pub is_active: bool,
    pub pending_approval: bool,
}

/// Who gets told about a pending registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approver {
    /// The first developer account.
    Developer,
    /// The first admin that is already active.
    ActiveAdmin,
}

/// Work done in the same transaction as a user insert.
pub enum FollowUp<'a> {
    Nothing,
    NotifyApprover { approver: Approver, message: &'a str },
    EmptyStudentProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    pub user_id: i64,
    /// Recipient of the approval notification, if one was sent.
    pub notified: Option<i64>,
}

pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub created_at: String,
    pub is_read: bool,
}

pub struct CourseRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub created_at: String,
    pub file_url: Option<String>,
    pub author_id: i64,
}

pub struct CourseVisitRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub course_id: i64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentProfileRow {
    pub level: Option<String>,
    pub school: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
}

pub struct SettingsRow {
    pub platform_name: String,
    pub platform_description: String,
    pub support_email: String,
    pub logo_filename: Option<String>,
}
