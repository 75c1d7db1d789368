use std::str::FromStr;
use std::sync::Arc;

use tracing::error;

use academia_db::Database;

use crate::error::AppError;
use crate::files::Storage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub registration: RegistrationMode,
    pub session_days: i64,
}

/// How new accounts become usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMode {
    /// Admins and teachers wait for an approver; students are active at once.
    Approval,
    /// Everyone is active and logged in straight after registering.
    Immediate,
}

impl FromStr for RegistrationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approval" => Ok(RegistrationMode::Approval),
            "immediate" => Ok(RegistrationMode::Immediate),
            other => Err(format!("unknown registration mode '{}'", other)),
        }
    }
}

/// Run blocking DB work off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
        .map_err(AppError::from)
}
