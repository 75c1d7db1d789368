use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use academia_types::models::{Role, User};

use crate::error::Redirect;
use crate::state::{AppState, with_db};
use crate::views;

pub const SESSION_COOKIE: &str = "academia_session";
pub const UNREAD_HEADER: HeaderName = HeaderName::from_static("x-unread-notifications");

/// The user behind the current request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
}

impl Identity {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_developer(&self) -> bool {
        self.user.is_developer
    }

    /// Admin capability needs an approved account, not just the flag.
    pub fn is_admin(&self) -> bool {
        self.user.is_admin && self.user.is_active
    }
}

/// Result of session resolution, present on every request that passed
/// through [`load_identity`].
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<Identity>);

/// Why a guard turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    NotLoggedIn,
    NotDeveloper,
    NotAdmin,
}

impl Denied {
    pub fn redirect(self) -> Redirect {
        match self {
            Denied::NotLoggedIn => Redirect::warning("/login", "Please log in."),
            Denied::NotDeveloper => Redirect::danger("/", "This page is for the developer only."),
            Denied::NotAdmin => Redirect::danger("/", "This page is for admins only."),
        }
    }
}

impl IntoResponse for Denied {
    fn into_response(self) -> Response {
        self.redirect().into_response()
    }
}

// -- Guards --

pub fn check_authenticated(current: &CurrentUser) -> Result<&Identity, Denied> {
    current.0.as_ref().ok_or(Denied::NotLoggedIn)
}

pub fn check_developer(current: &CurrentUser) -> Result<&Identity, Denied> {
    let identity = check_authenticated(current)?;
    if identity.is_developer() {
        Ok(identity)
    } else {
        Err(Denied::NotDeveloper)
    }
}

pub fn check_admin(current: &CurrentUser) -> Result<&Identity, Denied> {
    let identity = check_authenticated(current)?;
    if identity.is_admin() {
        Ok(identity)
    } else {
        Err(Denied::NotAdmin)
    }
}

type Guard = for<'a> fn(&'a CurrentUser) -> Result<&'a Identity, Denied>;

async fn gate(req: Request, next: Next, guard: Guard) -> Response {
    let decision = match req.extensions().get::<CurrentUser>() {
        Some(current) => guard(current).map(|_| ()),
        None => Err(Denied::NotLoggedIn),
    };

    match decision {
        Ok(()) => next.run(req).await,
        Err(denied) => {
            warn!("{} {} denied: {:?}", req.method(), req.uri().path(), denied);
            denied.into_response()
        }
    }
}

pub async fn require_auth(req: Request, next: Next) -> Response {
    gate(req, next, check_authenticated).await
}

pub async fn require_developer(req: Request, next: Next) -> Response {
    gate(req, next, check_developer).await
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    gate(req, next, check_admin).await
}

// -- Session resolution --

/// Candidate session tokens in lookup order: the cookie first, then
/// `Authorization: Bearer`.
pub fn session_tokens(headers: &HeaderMap) -> Vec<String> {
    let mut tokens = Vec::with_capacity(2);
    if let Some(cookie) = CookieJar::from_headers(headers).get(SESSION_COOKIE) {
        tokens.push(cookie.value().to_string());
    }

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if let Some(bearer) = bearer {
        if !tokens.iter().any(|t| t == bearer) {
            tokens.push(bearer.to_string());
        }
    }
    tokens
}

/// Tokens are stored hashed so a leaked database holds no usable sessions.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Resolve the session (if any) to an [`Identity`], and stamp the live
/// unread-notification count onto the response for logged-in callers.
pub async fn load_identity(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    // A stale cookie must not hide a valid bearer token.
    let hashes: Vec<String> = session_tokens(req.headers()).iter().map(|t| hash_token(t)).collect();
    let identity = if hashes.is_empty() {
        None
    } else {
        let found = with_db(&state, move |db| {
            for token_hash in &hashes {
                if let Some(row) = db.get_session_user(token_hash)? {
                    return Ok(Some(row));
                }
            }
            Ok(None)
        })
        .await;
        match found {
            Ok(row) => row.map(|row| Identity { user: views::user(row) }),
            Err(e) => return e.into_response(),
        }
    };

    let user_id = identity.as_ref().map(Identity::id);
    if let Some(identity) = &identity {
        debug!("Request from user {} ({})", identity.id(), identity.role());
    }
    req.extensions_mut().insert(CurrentUser(identity));

    let mut res = next.run(req).await;

    if let Some(user_id) = user_id {
        match with_db(&state, move |db| db.unread_notification_count(user_id)).await {
            Ok(count) => {
                res.headers_mut().insert(UNREAD_HEADER, HeaderValue::from(count));
            }
            Err(e) => warn!("Unread count for user {} failed: {}", user_id, e),
        }
    }

    res
}

// -- Extractors --

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned().unwrap_or_default())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Denied;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .and_then(|current| current.0.clone())
            .ok_or(Denied::NotLoggedIn)
    }
}
