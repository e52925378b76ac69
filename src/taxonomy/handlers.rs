//! Owned-collection endpoints shared by tags and ingredients.
//!
//! Each handler is generic over a [`Collection`] marker, so the two resources
//! are the same code instantiated for a different [`AttributeKind`].

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{AttributeRequest, AttributeResponse, ListQuery},
    repo::AttributeRepo,
    repo_types::AttributeKind,
};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    filters::AttributeFilter,
    state::AppState,
};

const MAX_NAME_LEN: usize = 255;

pub trait Collection: Send + Sync + 'static {
    const KIND: AttributeKind;
}

pub struct Tags;
pub struct Ingredients;

impl Collection for Tags {
    const KIND: AttributeKind = AttributeKind::Tag;
}

impl Collection for Ingredients {
    const KIND: AttributeKind = AttributeKind::Ingredient;
}

pub fn routes<C: Collection>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(list::<C>).post(create::<C>))
        .route(
            &format!("{path}/:id"),
            get(retrieve::<C>)
                .put(replace::<C>)
                .patch(modify::<C>)
                .delete(destroy::<C>),
        )
}

fn not_found(kind: AttributeKind) -> ApiError {
    ApiError::not_found(format!("{} not found", kind.label()))
}

/// Trimmed, non-blank name of bounded length.
fn checked_name(name: Option<String>) -> ApiResult<String> {
    let name = name.ok_or_else(|| ApiError::field("name", "This field is required."))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::field("name", "This field may not be blank."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::field(
            "name",
            format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
        ));
    }
    Ok(name.to_string())
}

#[instrument(skip(state, user, query), fields(kind = ?C::KIND))]
pub async fn list<C: Collection>(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AttributeResponse>>> {
    let Query(query) = query?;
    let filter = AttributeFilter::new(user.id(), query.assigned_only.as_deref());
    let rows = state.store.list_attributes(C::KIND, &filter).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user, payload), fields(kind = ?C::KIND))]
pub async fn create<C: Collection>(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<AttributeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AttributeResponse>)> {
    let Json(payload) = payload?;
    let name = checked_name(payload.name)?;
    let row = state.store.create_attribute(C::KIND, user.id(), &name).await?;
    info!(id = row.id, owner = row.user_id, "{} created", C::KIND.label());
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state, user, id), fields(kind = ?C::KIND))]
pub async fn retrieve<C: Collection>(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<AttributeResponse>> {
    let Path(id) = id?;
    let row = state
        .store
        .find_attribute(C::KIND, user.id(), id)
        .await?
        .ok_or_else(|| not_found(C::KIND))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, user, id, payload), fields(kind = ?C::KIND))]
pub async fn replace<C: Collection>(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AttributeRequest>, JsonRejection>,
) -> ApiResult<Json<AttributeResponse>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    rename::<C>(&state, user.id(), id, checked_name(payload.name)?).await
}

#[instrument(skip(state, user, id, payload), fields(kind = ?C::KIND))]
pub async fn modify<C: Collection>(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AttributeRequest>, JsonRejection>,
) -> ApiResult<Json<AttributeResponse>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    if payload.name.is_none() {
        return retrieve::<C>(State(state), user, Ok(Path(id))).await;
    }
    rename::<C>(&state, user.id(), id, checked_name(payload.name)?).await
}

async fn rename<C: Collection>(
    state: &AppState,
    owner: i64,
    id: i64,
    name: String,
) -> ApiResult<Json<AttributeResponse>> {
    let row = state
        .store
        .rename_attribute(C::KIND, owner, id, &name)
        .await?
        .ok_or_else(|| not_found(C::KIND))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, user, id), fields(kind = ?C::KIND))]
pub async fn destroy<C: Collection>(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    if !state.store.delete_attribute(C::KIND, user.id(), id).await? {
        return Err(not_found(C::KIND));
    }
    info!(id, owner = user.id(), "{} deleted", C::KIND.label());
    Ok(StatusCode::NO_CONTENT)
}
