use std::collections::BTreeSet;

use rust_decimal::Decimal;

use super::{
    dto::RecipeRequest,
    repo_types::{NewRecipe, RecipeChanges},
};
use crate::{
    db::Store,
    error::{ApiError, ApiResult, FieldErrors},
    taxonomy::{repo::AttributeRepo, repo_types::AttributeKind},
};

const MAX_TITLE_LEN: usize = 255;
const MAX_LINK_LEN: usize = 255;
const PRICE_DECIMAL_PLACES: u32 = 2;
const PRICE_MAX_DIGITS: u32 = 5;

const REQUIRED: &str = "This field is required.";

fn check_title(errors: &mut FieldErrors, title: String) -> Option<String> {
    let title = title.trim();
    if title.is_empty() {
        errors.add("title", "This field may not be blank.");
        return None;
    }
    if title.chars().count() > MAX_TITLE_LEN {
        errors.add(
            "title",
            format!("Ensure this field has no more than {MAX_TITLE_LEN} characters."),
        );
        return None;
    }
    Some(title.to_string())
}

/// At most two decimal places and five digits in total (`NUMERIC(5,2)`).
fn check_price(errors: &mut FieldErrors, price: Decimal) -> Option<Decimal> {
    let price = price.normalize();
    if price.scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            "price",
            format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."),
        );
        return None;
    }
    let limit = Decimal::from(10i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if price.abs() >= limit {
        errors.add(
            "price",
            format!("Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."),
        );
        return None;
    }
    Some(price.round_dp(PRICE_DECIMAL_PLACES))
}

/// Blank links are stored as absent.
fn check_link(errors: &mut FieldErrors, link: Option<String>) -> Option<String> {
    let link = link?;
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    if link.chars().count() > MAX_LINK_LEN {
        errors.add(
            "link",
            format!("Ensure this field has no more than {MAX_LINK_LEN} characters."),
        );
        return None;
    }
    Some(link.to_string())
}

/// Set semantics: duplicates collapse, order is by id.
fn id_set(ids: Vec<i64>) -> Vec<i64> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Validate a create or full-update body: every scalar field is required and
/// omitted tag/ingredient lists mean "none".
pub fn validate_full(req: RecipeRequest) -> ApiResult<NewRecipe> {
    let mut errors = FieldErrors::new();

    let title = match req.title {
        Some(t) => check_title(&mut errors, t),
        None => {
            errors.add("title", REQUIRED);
            None
        }
    };
    if req.time_minutes.is_none() {
        errors.add("time_minutes", REQUIRED);
    }
    let price = match req.price {
        Some(p) => check_price(&mut errors, p),
        None => {
            errors.add("price", REQUIRED);
            None
        }
    };
    let link = check_link(&mut errors, req.link.flatten());

    errors.into_result()?;
    let (Some(title), Some(time_minutes), Some(price)) = (title, req.time_minutes, price) else {
        return Err(ApiError::bad_request("incomplete recipe"));
    };
    Ok(NewRecipe {
        title,
        time_minutes,
        price,
        link,
        tags: id_set(req.tags.unwrap_or_default()),
        ingredients: id_set(req.ingredients.unwrap_or_default()),
    })
}

/// Validate a partial-update body: only supplied fields change.
pub fn validate_partial(req: RecipeRequest) -> ApiResult<RecipeChanges> {
    let mut errors = FieldErrors::new();
    let changes = RecipeChanges {
        title: req.title.and_then(|t| check_title(&mut errors, t)),
        time_minutes: req.time_minutes,
        price: req.price.and_then(|p| check_price(&mut errors, p)),
        link: req.link.map(|l| check_link(&mut errors, l)),
        tags: req.tags.map(id_set),
        ingredients: req.ingredients.map(id_set),
    };
    errors.into_result()?;
    Ok(changes)
}

/// Every referenced tag/ingredient id must name an existing row.
///
/// Rows of any owner are accepted; linking is not restricted to the recipe
/// owner's own tags and ingredients.
pub async fn check_links(
    store: &dyn Store,
    tags: Option<&[i64]>,
    ingredients: Option<&[i64]>,
) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    for (kind, field, ids) in [
        (AttributeKind::Tag, "tags", tags),
        (AttributeKind::Ingredient, "ingredients", ingredients),
    ] {
        let Some(ids) = ids.filter(|ids| !ids.is_empty()) else {
            continue;
        };
        let found: BTreeSet<i64> = store
            .attributes_by_ids(kind, ids)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();
        for id in ids.iter().filter(|id| !found.contains(id)) {
            errors.add(field, format!("Invalid pk \"{id}\" - object does not exist."));
        }
    }
    errors.into_result()
}
