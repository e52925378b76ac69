use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::repo_types::Recipe;
use crate::{storage::StorageClient, taxonomy::dto::AttributeResponse};

#[derive(Debug, Deserialize)]
pub struct RecipeQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Create/update body. No owner or image field: the owner comes from the
/// token and images go through the upload endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    pub link: Option<Option<String>>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

fn render_price(price: Decimal) -> String {
    let mut price = price;
    price.rescale(2);
    price.to_string()
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: String,
    pub link: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

impl RecipeResponse {
    pub fn new(recipe: Recipe, storage: &dyn StorageClient) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: render_price(recipe.price),
            link: recipe.link,
            image: recipe.image.as_deref().map(|k| storage.public_url(k)),
            tags: recipe.tags,
            ingredients: recipe.ingredients,
        }
    }
}

/// Single-recipe view with tags and ingredients expanded.
#[derive(Debug, Serialize)]
pub struct RecipeDetailResponse {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: String,
    pub link: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<AttributeResponse>,
    pub ingredients: Vec<AttributeResponse>,
}

impl RecipeDetailResponse {
    pub fn new(
        recipe: Recipe,
        tags: Vec<AttributeResponse>,
        ingredients: Vec<AttributeResponse>,
        storage: &dyn StorageClient,
    ) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: render_price(recipe.price),
            link: recipe.link,
            image: recipe.image.as_deref().map(|k| storage.public_url(k)),
            tags,
            ingredients,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: i64,
    pub image: Option<String>,
}
