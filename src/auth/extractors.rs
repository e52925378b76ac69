use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::claims::JwtKeys;
use crate::{
    error::ApiError,
    state::AppState,
    users::{repo::UserRepo, repo_types::User},
};

/// The authenticated principal: the active user a bearer token resolves to.
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .or_else(|| auth.strip_prefix("Token "))
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization scheme"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token.trim()).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        match state.store.find_user(claims.sub).await? {
            Some(user) if user.is_active => Ok(AuthUser(user)),
            Some(_) => {
                warn!(user_id = claims.sub, "token for inactive user");
                Err(ApiError::unauthorized("User inactive or deleted"))
            }
            None => {
                warn!(user_id = claims.sub, "token for unknown user");
                Err(ApiError::unauthorized("User inactive or deleted"))
            }
        }
    }
}
