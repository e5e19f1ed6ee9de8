use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
    users::repo_types::PublicUser,
    validation::ApiPath,
};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/:id", get(get_profile))
}

#[instrument(skip(state, _viewer))]
pub async fn get_profile(
    State(state): State<AppState>,
    _viewer: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        user: PublicUser::from(&user),
    }))
}
