use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{CreateUserRequest, TokenRequest, TokenResponse, UpdateMeRequest, UserResponse},
    repo::UserRepo,
    repo_types::{NewUser, UserChanges},
    services::{normalize_email, validate_profile_update, validate_registration},
};
use crate::{
    auth::{
        password::{hash_password, verify_dummy, verify_password},
        AuthUser, JwtKeys,
    },
    error::{ApiError, ApiResult, FieldErrors},
    state::AppState,
};

const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials";
const EMAIL_TAKEN: &str = "user with this email already exists";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/auth", post(create_token))
        .route("/user/me", get(get_me).patch(patch_me).put(put_me))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let Json(mut payload) = payload?;
    validate_registration(&mut payload)?;

    if state.store.find_user_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::field("email", EMAIL_TAKEN));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(NewUser {
            email: payload.email,
            name: payload.name,
            password_hash,
        })
        .await?
        .ok_or_else(|| ApiError::field("email", EMAIL_TAKEN))?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        warn!("token request with missing credentials");
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    }

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        verify_dummy(&payload.password);
        warn!(%email, "token request for unknown email");
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    };

    if !verify_password(&payload.password, &user.password_hash)? || !user.is_active {
        warn!(user_id = user.id, "token request rejected");
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(user))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

#[instrument(skip(state, user, payload))]
pub async fn patch_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UpdateMeRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(payload) = payload?;
    update_profile(&state, user.id, payload).await
}

#[instrument(skip(state, user, payload))]
pub async fn put_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UpdateMeRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(payload) = payload?;
    let mut missing = FieldErrors::new();
    if payload.name.is_none() {
        missing.add("name", "This field is required.");
    }
    if payload.password.is_none() {
        missing.add("password", "This field is required.");
    }
    missing.into_result()?;
    update_profile(&state, user.id, payload).await
}

async fn update_profile(
    state: &AppState,
    user_id: i64,
    mut payload: UpdateMeRequest,
) -> ApiResult<Json<UserResponse>> {
    validate_profile_update(&mut payload)?;

    let password_hash = payload
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;
    let changes = UserChanges {
        name: payload.name,
        password_hash,
    };

    let user = state
        .store
        .update_user(user_id, changes)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User inactive or deleted"))?;

    info!(user_id, "profile updated");
    Ok(Json(user.into()))
}
