use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, MeResponse, RefreshRequest, SigninRequest, SignupRequest},
        extractors::AuthUser,
        services,
    },
    error::ApiResult,
    state::AppState,
    users::repo_types::PublicUser,
    validation::ValidatedJson,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let (user, tokens) = services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: PublicUser::from(&user),
            token: tokens.access,
            refresh_token: tokens.refresh,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SigninRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (user, tokens) = services::authenticate(&state, &payload.login, &payload.password).await?;
    Ok(Json(AuthResponse {
        message: "Authentication successful",
        user: PublicUser::from(&user),
        token: tokens.access,
        refresh_token: tokens.refresh,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (user, tokens) = services::refresh(&state, &payload.refresh_token).await?;
    Ok(Json(AuthResponse {
        message: "Token refreshed",
        user: PublicUser::from(&user),
        token: tokens.access,
        refresh_token: tokens.refresh,
    }))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: PublicUser::from(&user),
    })
}
