//! Registration-time activation rules and the approve/reject review flow.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::{info, warn};

use academia_db::models::Approver;
use academia_types::api::PendingRequestsResponse;
use academia_types::models::Role;

use crate::error::{AppError, Redirect};
use crate::middleware::Identity;
use crate::state::{AppState, RegistrationMode, with_db};
use crate::views;

/// What a new account looks like and what has to happen alongside its insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPlan {
    pub is_admin: bool,
    pub is_active: bool,
    pub pending_approval: bool,
    pub follow_up: PlannedFollowUp,
    /// Start a session as part of registering.
    pub log_in: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedFollowUp {
    Nothing,
    Notify(Approver),
    EmptyStudentProfile,
}

pub fn plan_registration(role: Role, mode: RegistrationMode) -> RegistrationPlan {
    match mode {
        RegistrationMode::Approval => match role {
            Role::Admin => RegistrationPlan {
                is_admin: true,
                is_active: false,
                pending_approval: true,
                follow_up: PlannedFollowUp::Notify(Approver::Developer),
                log_in: false,
            },
            Role::Teacher => RegistrationPlan {
                is_admin: false,
                is_active: false,
                pending_approval: true,
                follow_up: PlannedFollowUp::Notify(Approver::ActiveAdmin),
                log_in: false,
            },
            Role::Student | Role::Developer => RegistrationPlan {
                is_admin: false,
                is_active: true,
                pending_approval: false,
                follow_up: PlannedFollowUp::Nothing,
                log_in: false,
            },
        },
        RegistrationMode::Immediate => RegistrationPlan {
            is_admin: role == Role::Admin,
            is_active: true,
            pending_approval: false,
            follow_up: if role == Role::Student {
                PlannedFollowUp::EmptyStudentProfile
            } else {
                PlannedFollowUp::Nothing
            },
            log_in: true,
        },
    }
}

/// Text of the notification sent to the approver.
pub fn request_message(role: Role, name: &str) -> String {
    format!("New {} request: {}", role, name)
}

/// Who is reviewing, and therefore which requests they may decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Decides admin requests.
    Developer,
    /// Decides teacher requests.
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Authority {
    pub fn may_review(self, target: Role) -> bool {
        match self {
            Authority::Developer => target == Role::Admin,
            Authority::Admin => target == Role::Teacher,
        }
    }

    fn requests_path(self) -> &'static str {
        match self {
            Authority::Developer => "/developer/requests",
            Authority::Admin => "/admin/requests",
        }
    }

    fn reviewed_role(self) -> Role {
        match self {
            Authority::Developer => Role::Admin,
            Authority::Admin => Role::Teacher,
        }
    }
}

/// Apply a decision to a target user.
///
/// A missing target is a 404. A target outside the reviewer's tier is left
/// untouched and the reviewer is sent back with a warning. Approving an
/// already-approved user is harmless.
pub async fn review(
    state: &AppState,
    reviewer: &Identity,
    target_id: i64,
    authority: Authority,
    decision: Decision,
) -> Result<Redirect, AppError> {
    let back = authority.requests_path();
    let role = authority.reviewed_role();

    let target = with_db(state, move |db| db.get_user_by_id(target_id))
        .await?
        .ok_or(AppError::NotFound)?;

    if !authority.may_review(target.role()) {
        warn!(
            "User {} tried to {:?} user {} ({}) as {:?}",
            reviewer.id(),
            decision,
            target_id,
            target.role(),
            authority
        );
        return Ok(Redirect::warning(back, format!("This is not a {} request.", role)));
    }

    match decision {
        Decision::Approve => {
            if !with_db(state, move |db| db.activate_user(target_id)).await? {
                return Err(AppError::NotFound);
            }
            info!("User {} approved {} {}", reviewer.id(), role, target_id);
            Ok(Redirect::success(back, format!("The {} has been approved.", role)))
        }
        Decision::Reject => {
            if !with_db(state, move |db| db.delete_user(target_id)).await? {
                return Err(AppError::NotFound);
            }
            info!("User {} rejected {} {}", reviewer.id(), role, target_id);
            Ok(Redirect::danger(back, format!("The {} request has been rejected.", role)))
        }
    }
}

// -- Developer: admin requests --

pub async fn developer_requests(
    State(state): State<AppState>,
) -> Result<Json<PendingRequestsResponse>, AppError> {
    let rows = with_db(&state, |db| db.pending_admins()).await?;
    Ok(Json(PendingRequestsResponse {
        pending: rows.into_iter().map(views::user).collect(),
    }))
}

pub async fn developer_approve(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<i64>,
) -> Result<Redirect, AppError> {
    review(&state, &identity, user_id, Authority::Developer, Decision::Approve).await
}

pub async fn developer_reject(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<i64>,
) -> Result<Redirect, AppError> {
    review(&state, &identity, user_id, Authority::Developer, Decision::Reject).await
}

// -- Admin: teacher requests --

pub async fn admin_requests(
    State(state): State<AppState>,
) -> Result<Json<PendingRequestsResponse>, AppError> {
    let rows = with_db(&state, |db| db.pending_non_admins()).await?;
    Ok(Json(PendingRequestsResponse {
        pending: rows.into_iter().map(views::user).collect(),
    }))
}

pub async fn admin_approve(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<i64>,
) -> Result<Redirect, AppError> {
    review(&state, &identity, user_id, Authority::Admin, Decision::Approve).await
}

pub async fn admin_reject(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<i64>,
) -> Result<Redirect, AppError> {
    review(&state, &identity, user_id, Authority::Admin, Decision::Reject).await
}
