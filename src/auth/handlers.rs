use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    api::JsonBody,
    auth::{
        dto::{
            ChangePasswordRequest, CredentialsRequest, MeResponse, MessageResponse,
            RefreshRequest, RefreshResponse, SignInResponse,
        },
        middleware::AuthUser,
        services::{is_valid_email, validate_password},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/refresh", post(refresh))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/password", post(change_password))
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let email = payload.email.trim();
    if !is_valid_email(email) {
        warn!(email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    validate_password(&payload.password)?;

    state.accounts.create_user(email, &payload.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CredentialsRequest>,
) -> AppResult<Json<SignInResponse>> {
    let user = state
        .accounts
        .sign_in(payload.email.trim(), &payload.password)
        .await?;

    let token = state.keys.sign_access(user.id).map_err(anyhow::Error::from)?;
    let refresh_token = state.keys.sign_refresh(user.id).map_err(anyhow::Error::from)?;

    Ok(Json(SignInResponse {
        token,
        refresh_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let claims = state
        .keys
        .verify_refresh(&payload.refresh_token, OffsetDateTime::now_utc())
        .map_err(|e| {
            warn!(error = %e, "refresh rejected");
            AppError::Unauthorized("Invalid refresh token")
        })?;

    let user = state
        .accounts
        .get_user_by_id(claims.subject_user_id())
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => {
                warn!(user_id = claims.subject_user_id(), "refresh for unknown user");
                AppError::Unauthorized("Invalid refresh token")
            }
            other => other,
        })?;
    let token = state.keys.sign_access(user.id).map_err(anyhow::Error::from)?;

    info!(user_id = user.id, "access token refreshed");
    Ok(Json(RefreshResponse { token }))
}

#[instrument(skip(state))]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<MeResponse>> {
    let user = state.accounts.get_user_by_id(auth.user_id).await?;
    Ok(Json(MeResponse { user }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password(&payload.new_password)?;
    state
        .accounts
        .change_password(auth.user_id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
