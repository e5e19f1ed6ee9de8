use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    admin::{
        dto::{
            BanRequest, ChangeRoleRequest, ListUsersQuery, UserActionResponse,
            UserDetailsResponse, UserListResponse,
        },
        services,
    },
    auth::extractors::AdminUser,
    error::{ApiError, ApiResult},
    state::AppState,
    users::repo_types::AdminUserView,
    validation::{ApiPath, ApiQuery, OptionalJson, ValidatedJson},
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/ban", post(ban_user))
        .route("/users/:id/unban", post(unban_user))
        .route("/users/:id/role", put(change_role))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(q): ApiQuery<ListUsersQuery>,
) -> ApiResult<Json<UserListResponse>> {
    let page = q.page_query();
    let (users, total) = state
        .users
        .list(q.role, page.limit(), page.offset())
        .await?;

    Ok(Json(UserListResponse {
        users: users.iter().map(AdminUserView::from).collect(),
        pagination: page.meta(total),
    }))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<UserDetailsResponse>> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserDetailsResponse {
        user: AdminUserView::from(&user),
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn ban_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    OptionalJson(payload): OptionalJson<BanRequest>,
) -> ApiResult<Json<UserActionResponse>> {
    let user = services::ban_user(state.users.as_ref(), &admin, id, payload.reason).await?;
    Ok(Json(UserActionResponse {
        message: "User successfully banned".into(),
        user: AdminUserView::from(&user),
    }))
}

#[instrument(skip(state, admin))]
pub async fn unban_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<UserActionResponse>> {
    let user = services::unban_user(state.users.as_ref(), &admin, id).await?;
    Ok(Json(UserActionResponse {
        message: "User successfully unbanned".into(),
        user: AdminUserView::from(&user),
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn change_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<ChangeRoleRequest>,
) -> ApiResult<Json<UserActionResponse>> {
    let user = services::change_role(state.users.as_ref(), &admin, id, payload.role).await?;
    Ok(Json(UserActionResponse {
        message: format!("User role successfully changed to {}", user.role),
        user: AdminUserView::from(&user),
    }))
}
