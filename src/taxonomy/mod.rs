//! Tags and ingredients: name-only collections owned by one user.

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

use handlers::{routes, Ingredients, Tags};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(routes::<Tags>("/recipe/tags"))
        .merge(routes::<Ingredients>("/recipe/ingredients"))
}
