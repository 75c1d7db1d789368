use anyhow::Context;
use tracing::info;

use academia_db::Database;
use academia_db::models::NewUser;
use academia_types::models::Role;

use crate::password::hash_password;

pub const DEVELOPER_NAME: &str = "Developer";

/// Make sure the developer account exists. An existing account with the
/// same email is left as it is, password included.
pub fn ensure_developer(db: &Database, email: &str, password: &str) -> anyhow::Result<i64> {
    if let Some(existing) = db.get_user_by_email(email)? {
        return Ok(existing.id);
    }

    let category = db
        .get_category_by_role(Role::Admin)?
        .context("admin category missing; migrations did not seed it")?;
    let password_hash = hash_password(password)?;

    let id = db.ensure_user(&NewUser {
        name: DEVELOPER_NAME,
        email,
        password_hash: &password_hash,
        category_id: Some(category.id),
        is_admin: false,
        is_developer: true,
        is_active: true,
        pending_approval: false,
    })?;

    info!("Developer account {} ready ({})", id, email);
    Ok(id)
}
