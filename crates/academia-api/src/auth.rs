use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::info;

use academia_db::models::{FollowUp, NewUser};
use academia_types::api::{LoginRequest, LoginResponse, Notice, RegisterRequest, RegisterResponse};
use academia_types::models::{Category, NoticeLevel, Role};

use crate::approvals::{self, PlannedFollowUp};
use crate::error::{AppError, Redirect};
use crate::middleware::{SESSION_COOKIE, hash_token, session_tokens};
use crate::password::{hash_password, verify_password};
use crate::state::{AppState, with_db};
use crate::{validate, views};

/// GET /register: the categories a new user can pick from.
pub async fn register_form(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    let rows = with_db(&state, |db| db.list_categories()).await?;
    Ok(Json(rows.into_iter().map(views::category).collect()))
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = validate::name(&req.name)?;
    let email = validate::email(&req.email)?;
    validate::password(&req.password)?;

    let category_id = req.category_id;
    let category = with_db(&state, move |db| match category_id {
        Some(id) => db.get_category(id),
        None => db.get_category_by_role(Role::Student),
    })
    .await?
    .ok_or_else(|| AppError::validation("Unknown user category."))?;

    let role = Role::from_category_name(&category.name);
    let plan = approvals::plan_registration(role, state.registration);
    let message = approvals::request_message(role, &name);
    let password = req.password;

    let (registered, row) = with_db(&state, move |db| {
        let password_hash = hash_password(&password)?;
        let new_user = NewUser {
            name: &name,
            email: &email,
            password_hash: &password_hash,
            category_id: Some(category.id),
            is_admin: plan.is_admin,
            is_developer: false,
            is_active: plan.is_active,
            pending_approval: plan.pending_approval,
        };
        let follow_up = match plan.follow_up {
            PlannedFollowUp::Nothing => FollowUp::Nothing,
            PlannedFollowUp::Notify(approver) => FollowUp::NotifyApprover {
                approver,
                message: &message,
            },
            PlannedFollowUp::EmptyStudentProfile => FollowUp::EmptyStudentProfile,
        };

        let registered = db.register_user(&new_user, follow_up)?;
        let row = db
            .get_user_by_id(registered.user_id)?
            .ok_or_else(|| anyhow::anyhow!("user {} vanished after insert", registered.user_id))?;
        Ok((registered, row))
    })
    .await?;

    info!(
        "Registered user {} as {} (active: {}, approver notified: {:?})",
        registered.user_id, role, plan.is_active, registered.notified
    );

    let (jar, token) = if plan.log_in {
        let token = start_session(&state, registered.user_id).await?;
        (jar.add(session_cookie(token.clone())), Some(token))
    } else {
        (jar, None)
    };

    let notice = if plan.pending_approval {
        Notice {
            level: NoticeLevel::Info,
            message: "Account created. It will be usable once an approver accepts it.".into(),
            redirect: Some("/login".into()),
        }
    } else {
        Notice {
            level: NoticeLevel::Success,
            message: "Account created.".into(),
            redirect: Some(if token.is_some() { "/" } else { "/login" }.into()),
        }
    };

    Ok((
        StatusCode::CREATED,
        jar,
        Json(RegisterResponse {
            user: views::user(row),
            notice,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = req.email.trim().to_lowercase();
    let password = req.password;

    let user = with_db(&state, move |db| {
        let Some(user) = db.get_user_by_email(&email)? else {
            return Ok(None);
        };
        Ok(verify_password(&user.password_hash, &password).then_some(user))
    })
    .await?
    .ok_or(AppError::InvalidCredentials)?;

    if !user.is_active {
        return Err(AppError::Forbidden(
            "Your account is not activated yet. Please wait for approval.".into(),
        ));
    }

    let token = start_session(&state, user.id).await?;
    info!("User {} logged in", user.id);

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(LoginResponse {
            user: views::user(user),
            token,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let hashes: Vec<String> = session_tokens(&headers).iter().map(|t| hash_token(t)).collect();
    if !hashes.is_empty() {
        with_db(&state, move |db| {
            for token_hash in &hashes {
                db.delete_session(token_hash)?;
            }
            Ok(())
        })
        .await?;
    }

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::new("/", NoticeLevel::Info, "You have been logged out."),
    ))
}

/// Create a session row and return the raw token. Only its hash is stored.
pub async fn start_session(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let bytes: [u8; 32] = rand::random();
    let token = URL_SAFE_NO_PAD.encode(bytes);

    let token_hash = hash_token(&token);
    let days = state.session_days;
    with_db(state, move |db| db.create_session(&token_hash, user_id, days)).await?;

    Ok(token)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
