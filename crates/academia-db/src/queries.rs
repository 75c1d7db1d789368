use crate::models::{
    Approver, CategoryRow, CourseRow, CourseVisitRow, FollowUp, NewUser, NotificationRow,
    Registered, SettingsRow, StudentProfileRow, UserRow,
};
use crate::{Database, DbError};
use academia_types::models::Role;
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.password_hash, u.category_id, c.name, \
     u.is_admin, u.is_developer, u.is_active, u.pending_approval, u.profile_image, u.created_at";

impl Database {
    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, description FROM categories ORDER BY name ASC")?;
            let rows = stmt
                .query_map([], map_category)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_category(&self, id: i64) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, description FROM categories WHERE id = ?1",
                    [id],
                    map_category,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_category_by_role(&self, role: Role) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, description FROM categories WHERE name = ?1",
                    [role.as_str()],
                    map_category,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Users --

    /// Insert a user and run its follow-up in one transaction.
    ///
    /// A taken email surfaces as [`DbError::DuplicateEmail`] from the UNIQUE
    /// constraint; there is no separate existence check.
    pub fn register_user(&self, user: &NewUser<'_>, follow_up: FollowUp<'_>) -> Result<Registered> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let user_id = insert_user(&tx, user)?;

            let notified = match follow_up {
                FollowUp::Nothing => None,
                FollowUp::NotifyApprover { approver, message } => {
                    let approver_id = find_approver(&tx, approver)?;
                    if let Some(approver_id) = approver_id {
                        insert_notification(&tx, approver_id, message)?;
                    }
                    approver_id
                }
                FollowUp::EmptyStudentProfile => {
                    tx.execute("INSERT INTO student_profiles (user_id) VALUES (?1)", [user_id])?;
                    None
                }
            };

            tx.commit()?;
            Ok(Registered { user_id, notified })
        })
    }

    /// Create the account if no user holds this email yet. Returns the id
    /// of whichever row owns the email afterwards.
    pub fn ensure_user(&self, user: &NewUser<'_>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users
                    (name, email, password_hash, category_id, is_admin, is_developer, is_active, pending_approval)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                (
                    user.name,
                    user.email,
                    user.password_hash,
                    user.category_id,
                    user.is_admin,
                    user.is_developer,
                    user.is_active,
                    user.pending_approval,
                ),
            )?;
            let id = conn.query_row("SELECT id FROM users WHERE email = ?1", [user.email], |row| {
                row.get(0)
            })?;
            Ok(id)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users u LEFT JOIN categories c ON c.id = u.category_id
                 WHERE u.id = ?1"
            );
            let row = conn.query_row(&sql, [id], map_user).optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users u LEFT JOIN categories c ON c.id = u.category_id
                 WHERE u.email = ?1"
            );
            let row = conn.query_row(&sql, [email], map_user).optional()?;
            Ok(row)
        })
    }

    /// Admin requests awaiting a developer.
    pub fn pending_admins(&self) -> Result<Vec<UserRow>> {
        self.query_users("u.is_admin = 1 AND u.pending_approval = 1")
    }

    /// Non-admin requests awaiting an admin.
    pub fn pending_non_admins(&self) -> Result<Vec<UserRow>> {
        self.query_users("u.pending_approval = 1 AND u.is_admin = 0 AND u.is_developer = 0")
    }

    fn query_users(&self, filter: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users u LEFT JOIN categories c ON c.id = u.category_id
                 WHERE {filter}
                 ORDER BY u.id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark a user approved. Returns false if the row is gone.
    pub fn activate_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_active = 1, pending_approval = 0 WHERE id = ?1",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Hard delete. Sessions, notifications and the profile go with it.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn update_user_name(&self, id: i64, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET name = ?1 WHERE id = ?2", (name, id))?;
            Ok(())
        })
    }

    pub fn set_profile_image(&self, id: i64, filename: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET profile_image = ?1 WHERE id = ?2", (filename, id))?;
            Ok(())
        })
    }

    // -- Sessions --

    pub fn create_session(&self, token_hash: &str, user_id: i64, ttl_days: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token_hash, user_id, expires_at)
                 VALUES (?1, ?2, datetime('now', ?3 || ' days'))",
                (token_hash, user_id, ttl_days),
            )?;
            Ok(())
        })
    }

    /// Resolve an unexpired session to its user.
    pub fn get_session_user(&self, token_hash: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 LEFT JOIN categories c ON c.id = u.category_id
                 WHERE s.token_hash = ?1 AND s.expires_at > datetime('now')"
            );
            let row = conn.query_row(&sql, [token_hash], map_user).optional()?;
            Ok(row)
        })
    }

    pub fn delete_session(&self, token_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
            Ok(())
        })
    }

    pub fn delete_expired_sessions(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE expires_at <= datetime('now')", [])?;
            Ok(n)
        })
    }

    // -- Notifications --

    pub fn unread_notification_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn list_notifications(&self, user_id: i64) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, message, created_at, is_read FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_notification(&self, id: i64) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, message, created_at, is_read FROM notifications WHERE id = ?1",
                    [id],
                    map_notification,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn mark_notification_read(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE notifications SET is_read = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Courses --

    pub fn insert_course(
        &self,
        title: &str,
        description: &str,
        category: &str,
        author_id: i64,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO courses (title, description, category, author_id) VALUES (?1, ?2, ?3, ?4)",
                (title, description, category, author_id),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_course(&self, id: i64) -> Result<Option<CourseRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, title, description, category, created_at, file_url, author_id
                     FROM courses WHERE id = ?1",
                    [id],
                    map_course,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Newest first. `text` matches title or description, `category` the
    /// category; both are case-insensitive substring filters and combine with AND.
    pub fn list_courses(&self, text: Option<&str>, category: Option<&str>) -> Result<Vec<CourseRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, category, created_at, file_url, author_id
                 FROM courses
                 WHERE (?1 IS NULL
                        OR instr(lower(title), lower(?1)) > 0
                        OR instr(lower(description), lower(?1)) > 0)
                   AND (?2 IS NULL OR instr(lower(category), lower(?2)) > 0)
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map((text, category), map_course)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_course_file(&self, id: i64, file_url: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE courses SET file_url = ?1 WHERE id = ?2", (file_url, id))?;
            Ok(())
        })
    }

    /// Append a visit. No deduplication; `user_id` is stored as given.
    pub fn record_course_visit(&self, course_id: i64, user_id: Option<i64>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO course_visits (user_id, course_id) VALUES (?1, ?2)",
                (user_id, course_id),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn course_visit_count(&self, course_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM course_visits WHERE course_id = ?1",
                [course_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn recent_course_visits(&self, course_id: i64, limit: u32) -> Result<Vec<CourseVisitRow>> {
        self.with_conn(|conn| {
            // LEFT JOIN: visitors may be anonymous or since deleted
            let mut stmt = conn.prepare(
                "SELECT v.id, v.user_id, u.name, v.course_id, v.timestamp
                 FROM course_visits v
                 LEFT JOIN users u ON u.id = v.user_id
                 WHERE v.course_id = ?1
                 ORDER BY v.timestamp DESC, v.id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map((course_id, limit), |row| {
                    Ok(CourseVisitRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        user_name: row.get(2)?,
                        course_id: row.get(3)?,
                        timestamp: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Student profiles --

    pub fn get_student_profile(&self, user_id: i64) -> Result<Option<StudentProfileRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT level, school, phone, birth_date, gender, city
                     FROM student_profiles WHERE user_id = ?1",
                    [user_id],
                    |row| {
                        Ok(StudentProfileRow {
                            level: row.get(0)?,
                            school: row.get(1)?,
                            phone: row.get(2)?,
                            birth_date: row.get(3)?,
                            gender: row.get(4)?,
                            city: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Create the profile row or overwrite it in place.
    pub fn upsert_student_profile(&self, user_id: i64, profile: &StudentProfileRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO student_profiles (user_id, level, school, phone, birth_date, gender, city)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id) DO UPDATE SET
                    level = excluded.level,
                    school = excluded.school,
                    phone = excluded.phone,
                    birth_date = excluded.birth_date,
                    gender = excluded.gender,
                    city = excluded.city",
                (
                    user_id,
                    &profile.level,
                    &profile.school,
                    &profile.phone,
                    &profile.birth_date,
                    &profile.gender,
                    &profile.city,
                ),
            )?;
            Ok(())
        })
    }

    // -- Settings --

    pub fn get_settings(&self) -> Result<SettingsRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "SELECT platform_name, platform_description, support_email, logo_filename
                 FROM settings WHERE id = 1",
                [],
                |row| {
                    Ok(SettingsRow {
                        platform_name: row.get(0)?,
                        platform_description: row.get(1)?,
                        support_email: row.get(2)?,
                        logo_filename: row.get(3)?,
                    })
                },
            )?;
            Ok(row)
        })
    }

    pub fn update_settings(&self, name: &str, description: &str, support_email: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE settings SET platform_name = ?1, platform_description = ?2, support_email = ?3
                 WHERE id = 1",
                (name, description, support_email),
            )?;
            Ok(())
        })
    }

    pub fn set_settings_logo(&self, filename: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE settings SET logo_filename = ?1 WHERE id = 1", [filename])?;
            Ok(())
        })
    }
}

fn insert_user(conn: &Connection, user: &NewUser<'_>) -> Result<i64> {
    let inserted = conn.execute(
        "INSERT INTO users
            (name, email, password_hash, category_id, is_admin, is_developer, is_active, pending_approval)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            user.name,
            user.email,
            user.password_hash,
            user.category_id,
            user.is_admin,
            user.is_developer,
            user.is_active,
            user.pending_approval,
        ),
    );

    match inserted {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Err(DbError::DuplicateEmail(user.email.to_string()).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn find_approver(conn: &Connection, approver: Approver) -> Result<Option<i64>> {
    let sql = match approver {
        Approver::Developer => "SELECT id FROM users WHERE is_developer = 1 ORDER BY id ASC LIMIT 1",
        Approver::ActiveAdmin => {
            "SELECT id FROM users WHERE is_admin = 1 AND is_active = 1 ORDER BY id ASC LIMIT 1"
        }
    };
    let id = conn.query_row(sql, [], |row| row.get(0)).optional()?;
    Ok(id)
}

fn insert_notification(conn: &Connection, user_id: i64, message: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, message) VALUES (?1, ?2)",
        (user_id, message),
    )?;
    Ok(conn.last_insert_rowid())
}

fn map_category(row: &Row<'_>) -> rusqlite::Result<CategoryRow> {
    Ok(CategoryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
        is_admin: row.get(6)?,
        is_developer: row.get(7)?,
        is_active: row.get(8)?,
        pending_approval: row.get(9)?,
        profile_image: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message: row.get(2)?,
        created_at: row.get(3)?,
        is_read: row.get(4)?,
    })
}

fn map_course(row: &Row<'_>) -> rusqlite::Result<CourseRow> {
    Ok(CourseRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        created_at: row.get(4)?,
        file_url: row.get(5)?,
        author_id: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
