use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument};

use super::{
    dto::{ImageResponse, RecipeDetailResponse, RecipeQuery, RecipeRequest, RecipeResponse},
    repo::RecipeRepo,
    repo_types::RecipeChanges,
    services::{check_links, validate_full, validate_partial},
};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    filters::RecipeFilter,
    images::services::{discard_blob, replace_recipe_image},
    state::AppState,
    taxonomy::{dto::AttributeResponse, repo::AttributeRepo, repo_types::AttributeKind},
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/recipes", get(list_recipes))
        .route("/recipe/recipes/:id", get(get_recipe))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/recipes", post(create_recipe))
        .route(
            "/recipe/recipes/:id",
            axum::routing::put(replace_recipe)
                .patch(modify_recipe)
                .delete(delete_recipe),
        )
        .route(
            "/recipe/recipes/:id/upload-image",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

fn recipe_not_found() -> ApiError {
    ApiError::not_found("Recipe not found")
}

#[instrument(skip(state, user, query))]
pub async fn list_recipes(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<RecipeQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<RecipeResponse>>> {
    let Query(query) = query?;
    let filter = RecipeFilter::new(
        user.id(),
        query.tags.as_deref(),
        query.ingredients.as_deref(),
    )?;
    let recipes = state.store.list_recipes(&filter).await?;
    let storage = state.storage.as_ref();
    Ok(Json(
        recipes
            .into_iter()
            .map(|r| RecipeResponse::new(r, storage))
            .collect(),
    ))
}

#[instrument(skip(state, user, id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    let Path(id) = id?;
    let recipe = state
        .store
        .find_recipe(user.id(), id)
        .await?
        .ok_or_else(recipe_not_found)?;

    let tags = state
        .store
        .attributes_by_ids(AttributeKind::Tag, &recipe.tags)
        .await?;
    let ingredients = state
        .store
        .attributes_by_ids(AttributeKind::Ingredient, &recipe.ingredients)
        .await?;

    Ok(Json(RecipeDetailResponse::new(
        recipe,
        tags.into_iter().map(AttributeResponse::from).collect(),
        ingredients.into_iter().map(AttributeResponse::from).collect(),
        state.storage.as_ref(),
    )))
}

#[instrument(skip(state, user, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecipeResponse>)> {
    let Json(payload) = payload?;
    let new = validate_full(payload)?;
    check_links(
        state.store.as_ref(),
        Some(new.tags.as_slice()),
        Some(new.ingredients.as_slice()),
    )
    .await?;

    let recipe = state.store.create_recipe(user.id(), new).await?;
    info!(recipe_id = recipe.id, owner = recipe.user_id, "recipe created");
    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse::new(recipe, state.storage.as_ref())),
    ))
}

/// PUT: every writable field is replaced; omitted tags/ingredients are cleared.
#[instrument(skip(state, user, id, payload))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> ApiResult<Json<RecipeResponse>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let changes = RecipeChanges::from(validate_full(payload)?);
    apply_changes(&state, user.id(), id, changes).await
}

/// PATCH: only supplied fields change.
#[instrument(skip(state, user, id, payload))]
pub async fn modify_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> ApiResult<Json<RecipeResponse>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let changes = validate_partial(payload)?;
    apply_changes(&state, user.id(), id, changes).await
}

async fn apply_changes(
    state: &AppState,
    owner: i64,
    id: i64,
    changes: RecipeChanges,
) -> ApiResult<Json<RecipeResponse>> {
    // ownership first, so a foreign id is NotFound rather than a field error
    if state.store.find_recipe(owner, id).await?.is_none() {
        return Err(recipe_not_found());
    }
    check_links(
        state.store.as_ref(),
        changes.tags.as_deref(),
        changes.ingredients.as_deref(),
    )
    .await?;

    let recipe = state
        .store
        .update_recipe(owner, id, changes)
        .await?
        .ok_or_else(recipe_not_found)?;
    info!(recipe_id = recipe.id, owner, "recipe updated");
    Ok(Json(RecipeResponse::new(recipe, state.storage.as_ref())))
}

#[instrument(skip(state, user, id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    let recipe = state
        .store
        .delete_recipe(user.id(), id)
        .await?
        .ok_or_else(recipe_not_found)?;
    if let Some(image) = recipe.image.as_deref() {
        discard_blob(&state, image).await;
    }
    info!(recipe_id = id, owner = user.id(), "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipe/recipes/:id/upload-image (multipart, exactly one `image` part)
#[instrument(skip(state, user, id, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    mp: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ImageResponse>> {
    let Path(id) = id?;
    let mut mp = mp?;

    let mut image: Option<Bytes> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        if image.is_some() {
            return Err(ApiError::bad_request("Exactly one image must be submitted."));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        image = Some(data);
    }
    let image = image.ok_or_else(|| ApiError::bad_request("No image was submitted."))?;

    let recipe = replace_recipe_image(&state, user.id(), id, image).await?;
    Ok(Json(ImageResponse {
        id: recipe.id,
        image: recipe.image.as_deref().map(|k| state.storage.public_url(k)),
    }))
}
