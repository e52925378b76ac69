use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Recipe row without its junction links.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal, // NUMERIC(5,2)
    pub link: Option<String>,
    pub image: Option<String>, // blob store key
}

/// A recipe with the ids of its linked tags and ingredients (sorted, unique).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

impl RecipeRow {
    pub fn with_links(self, tags: Vec<i64>, ingredients: Vec<i64>) -> Recipe {
        Recipe {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            time_minutes: self.time_minutes,
            price: self.price,
            link: self.link,
            image: self.image,
            tags,
            ingredients,
        }
    }
}

/// Every writable field of a recipe; the owner is supplied separately.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: Option<String>,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

/// Field changes; `None` leaves the column (or link set) untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<Option<String>>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

impl RecipeChanges {
    pub fn touches_columns(&self) -> bool {
        self.title.is_some()
            || self.time_minutes.is_some()
            || self.price.is_some()
            || self.link.is_some()
    }
}

/// A full replacement: every field set, omitted links cleared.
impl From<NewRecipe> for RecipeChanges {
    fn from(r: NewRecipe) -> Self {
        Self {
            title: Some(r.title),
            time_minutes: Some(r.time_minutes),
            price: Some(r.price),
            link: Some(r.link),
            tags: Some(r.tags),
            ingredients: Some(r.ingredients),
        }
    }
}
