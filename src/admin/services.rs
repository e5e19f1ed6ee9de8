use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        password::{hash_password, is_strong_enough},
        services::is_valid_username,
    },
    error::{ApiError, ApiResult},
    users::{
        repo::UserRepo,
        repo_types::{NewUser, Role, User},
    },
};

pub const DEFAULT_BAN_REASON: &str = "No reason provided";

async fn load(users: &dyn UserRepo, id: Uuid) -> ApiResult<User> {
    users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn ban_user(
    users: &dyn UserRepo,
    actor: &User,
    id: Uuid,
    reason: Option<String>,
) -> ApiResult<User> {
    let target = load(users, id).await?;
    if target.is_banned() {
        return Err(ApiError::BadRequest("User is already banned".into()));
    }
    if target.is_admin() {
        return Err(ApiError::forbidden("Cannot ban an administrator"));
    }

    let reason = reason.unwrap_or_else(|| DEFAULT_BAN_REASON.to_string());
    let user = users
        .ban(id, &reason)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(admin_id = %actor.id, user_id = %user.id, reason = %reason, "user banned");
    Ok(user)
}

pub async fn unban_user(users: &dyn UserRepo, actor: &User, id: Uuid) -> ApiResult<User> {
    let target = load(users, id).await?;
    if !target.is_banned() {
        return Err(ApiError::BadRequest("User is not banned".into()));
    }

    let user = users
        .unban(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(admin_id = %actor.id, user_id = %user.id, "user unbanned");
    Ok(user)
}

pub async fn change_role(
    users: &dyn UserRepo,
    actor: &User,
    id: Uuid,
    role: Role,
) -> ApiResult<User> {
    let target = load(users, id).await?;
    if target.id == actor.id {
        warn!(admin_id = %actor.id, "attempt to change own role");
        return Err(ApiError::forbidden("You cannot change your own role"));
    }
    if target.is_admin() && role == Role::Banned {
        return Err(ApiError::forbidden("Cannot ban an administrator"));
    }

    let user = users
        .set_role(id, role)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(admin_id = %actor.id, user_id = %user.id, from = %target.role, to = %role, "role changed");
    Ok(user)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminBootstrap {
    Created,
    Promoted,
    AlreadyAdmin,
}

/// Makes sure an admin account exists for `email`/`username`, promoting a matching
/// account or creating a new one. `password` is only needed when creating.
pub async fn ensure_admin(
    users: &dyn UserRepo,
    email: &str,
    username: &str,
    password: Option<&str>,
) -> anyhow::Result<(User, AdminBootstrap)> {
    let email = email.trim().to_lowercase();
    let username = username.trim();

    let existing = match users.find_by_email(&email).await? {
        Some(u) => Some(u),
        None => users.find_by_username(username).await?,
    };

    if let Some(user) = existing {
        if user.is_admin() {
            return Ok((user, AdminBootstrap::AlreadyAdmin));
        }
        let promoted = users
            .set_role(user.id, Role::Admin)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {} vanished during promotion", user.id))?;
        return Ok((promoted, AdminBootstrap::Promoted));
    }

    anyhow::ensure!(email.contains('@'), "admin email {email:?} is not an email address");
    anyhow::ensure!(
        (3..=30).contains(&username.chars().count()) && is_valid_username(username),
        "admin username must be 3-30 letters, digits or underscores"
    );
    let password = password
        .ok_or_else(|| anyhow::anyhow!("a password is required to create a new admin account"))?;
    anyhow::ensure!(
        (8..=128).contains(&password.chars().count()) && is_strong_enough(password),
        "admin password must be 8-128 characters with a letter and a digit"
    );

    let hash = hash_password(password)?;
    let user = users
        .create(NewUser {
            email: &email,
            username,
            password_hash: &hash,
            role: Role::Admin,
        })
        .await?;
    Ok((user, AdminBootstrap::Created))
}
