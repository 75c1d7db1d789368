//! Row → API model conversions.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use academia_db::models::{
    CategoryRow, CourseRow, CourseVisitRow, NotificationRow, SettingsRow, StudentProfileRow, UserRow,
};
use academia_types::models::{
    Category, Course, CourseVisit, Notification, Role, Settings, StudentProfile, User,
};

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC; RFC 3339 is accepted too.
pub fn timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn user(row: UserRow) -> User {
    let role = row.role();
    User {
        id: row.id,
        name: row.name,
        email: row.email,
        role,
        category_id: row.category_id,
        is_admin: row.is_admin,
        is_developer: row.is_developer,
        is_active: row.is_active,
        pending_approval: row.pending_approval,
        profile_image: row.profile_image,
        created_at: timestamp(&row.created_at),
    }
}

pub fn category(row: CategoryRow) -> Category {
    Category {
        id: row.id,
        role: Role::from_category_name(&row.name),
        name: row.name,
        description: row.description,
    }
}

pub fn notification(row: NotificationRow) -> Notification {
    Notification {
        id: row.id,
        user_id: row.user_id,
        message: row.message,
        created_at: timestamp(&row.created_at),
        is_read: row.is_read,
    }
}

pub fn course(row: CourseRow) -> Course {
    Course {
        id: row.id,
        title: row.title,
        description: row.description,
        category: row.category,
        created_at: timestamp(&row.created_at),
        file_url: row.file_url,
        author_id: row.author_id,
    }
}

pub fn course_visit(row: CourseVisitRow) -> CourseVisit {
    CourseVisit {
        id: row.id,
        user_id: row.user_id,
        user_name: row.user_name,
        course_id: row.course_id,
        timestamp: timestamp(&row.timestamp),
    }
}

pub fn student_profile(row: StudentProfileRow) -> StudentProfile {
    let birth_date = row.birth_date.as_deref().and_then(|raw| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| warn!("Corrupt birth_date '{}': {}", raw, e))
            .ok()
    });
    StudentProfile {
        level: row.level,
        school: row.school,
        phone: row.phone,
        birth_date,
        gender: row.gender,
        city: row.city,
    }
}

pub fn settings(row: SettingsRow) -> Settings {
    Settings {
        platform_name: row.platform_name,
        platform_description: row.platform_description,
        support_email: row.support_email,
        logo_filename: row.logo_filename,
    }
}
