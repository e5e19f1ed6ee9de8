use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::SignupRequest,
        jwt::{JwtKeys, TokenPair},
        password::{hash_password, is_strong_enough, verify_password},
    },
    error::{ApiError, ApiResult, FieldError},
    state::AppState,
    users::repo_types::{NewUser, Role, User},
};

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn banned(user: &User) -> ApiError {
    ApiError::Banned {
        reason: user.banned_reason.clone(),
        banned_at: user.banned_at,
    }
}

/// Creates a `member` account and signs it in.
pub async fn register(state: &AppState, req: SignupRequest) -> ApiResult<(User, TokenPair)> {
    let email = normalize_email(&req.email);
    let username = req.username.trim().to_string();

    let mut problems = Vec::new();
    if !is_valid_username(&username) {
        problems.push(FieldError::new(
            "username",
            "Username may only contain letters, numbers and underscores",
        ));
    }
    if !is_strong_enough(&req.password) {
        problems.push(FieldError::new(
            "password",
            "Password must contain at least one letter and one digit",
        ));
    }
    if !problems.is_empty() {
        return Err(ApiError::Validation(problems));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::conflict("Email already in use"));
    }
    if state.users.find_by_username(&username).await?.is_some() {
        warn!(username = %username, "username already taken");
        return Err(ApiError::conflict("Username already taken"));
    }

    let hash = hash_password(&req.password)?;
    let user = state
        .users
        .create(NewUser {
            email: &email,
            username: &username,
            password_hash: &hash,
            role: Role::Member,
        })
        .await
        .map_err(|e| {
            if e.is_duplicate("email") {
                ApiError::conflict("Email already in use")
            } else if e.is_duplicate("username") {
                ApiError::conflict("Username already taken")
            } else {
                e.into()
            }
        })?;

    let tokens = JwtKeys::from_ref(state).sign_pair(user.id)?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((user, tokens))
}

/// Checks credentials. `login` matches an email first, then a username.
pub async fn authenticate(
    state: &AppState,
    login: &str,
    password: &str,
) -> ApiResult<(User, TokenPair)> {
    let login = login.trim();
    let found = match state.users.find_by_email(&normalize_email(login)).await? {
        Some(u) => Some(u),
        None => state.users.find_by_username(login).await?,
    };

    let Some(user) = found else {
        warn!(login = %login, "signin unknown login");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "signin invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    if user.is_banned() {
        warn!(user_id = %user.id, "signin by banned user");
        return Err(banned(&user));
    }

    let tokens = JwtKeys::from_ref(state).sign_pair(user.id)?;
    info!(user_id = %user.id, "user signed in");
    Ok((user, tokens))
}

/// Exchanges a refresh token for a new pair, re-checking the account first.
pub async fn refresh(state: &AppState, refresh_token: &str) -> ApiResult<(User, TokenPair)> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::Unauthorized("Invalid or expired refresh token".into())
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired refresh token".into()))?;

    if user.is_banned() {
        return Err(banned(&user));
    }

    let tokens = keys.sign_pair(user.id)?;
    Ok((user, tokens))
}
