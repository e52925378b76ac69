//! Owner-scoped list filters.
//!
//! Parsing of query parameters and composition of the scoped SQL live here as
//! plain functions so they can be checked without a database. The in-memory
//! store evaluates the same filters through the `admits`/`matches` predicates.

use std::collections::BTreeSet;

use sqlx::{Postgres, QueryBuilder};

use crate::error::{ApiError, ApiResult};
use crate::recipes::repo_types::Recipe;
use crate::taxonomy::repo_types::AttributeKind;

/// Parse a comma-separated list of integer ids (`"1,2, 3"`).
///
/// Every token must be an integer; duplicates collapse and the result is
/// sorted.
pub fn parse_id_list(raw: &str) -> ApiResult<Vec<i64>> {
    let mut ids = BTreeSet::new();
    for token in raw.split(',') {
        let token = token.trim();
        let id = token
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request(format!("invalid id {token:?} in id list")))?;
        ids.insert(id);
    }
    Ok(ids.into_iter().collect())
}

/// Query-string flag: absent, empty or an integer zero is false, anything
/// else is true.
pub fn flag_enabled(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        None | Some("") => false,
        Some(value) => value.parse::<i64>().map_or(true, |n| n != 0),
    }
}

/// Listing of a principal's tags or ingredients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    pub owner: i64,
    /// Only rows linked to at least one recipe (of any owner).
    pub assigned_only: bool,
}

impl AttributeFilter {
    pub fn new(owner: i64, assigned_only: Option<&str>) -> Self {
        Self {
            owner,
            assigned_only: flag_enabled(assigned_only),
        }
    }

    /// Whether a row with this owner and recipe-link status is listed.
    pub fn admits(&self, owner: i64, linked: bool) -> bool {
        owner == self.owner && (!self.assigned_only || linked)
    }
}

/// Listing of a principal's recipes, narrowed by tag and ingredient ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub owner: i64,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

impl RecipeFilter {
    pub fn new(owner: i64, tags: Option<&str>, ingredients: Option<&str>) -> ApiResult<Self> {
        Ok(Self {
            owner,
            tags: tags.map(parse_id_list).transpose()?,
            ingredients: ingredients.map(parse_id_list).transpose()?,
        })
    }

    /// Owner matches and each supplied id list intersects the recipe's set.
    pub fn matches(&self, recipe: &Recipe) -> bool {
        fn intersects(wanted: &Option<Vec<i64>>, have: &[i64]) -> bool {
            wanted
                .as_ref()
                .map_or(true, |ids| have.iter().any(|id| ids.contains(id)))
        }
        recipe.user_id == self.owner
            && intersects(&self.tags, &recipe.tags)
            && intersects(&self.ingredients, &recipe.ingredients)
    }
}

/// `SELECT` for a principal's tags or ingredients, ordered by name.
///
/// The recipe-link restriction is an `EXISTS` subquery, so a row linked to
/// several recipes still appears once.
pub fn attribute_list_query(kind: AttributeKind, filter: &AttributeFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT a.id, a.user_id, a.name FROM {} a WHERE a.user_id = ",
        kind.table()
    ));
    qb.push_bind(filter.owner);
    if filter.assigned_only {
        qb.push(format!(
            " AND EXISTS (SELECT 1 FROM {link} l WHERE l.{col} = a.id)",
            link = kind.link_table(),
            col = kind.link_column()
        ));
    }
    qb.push(" ORDER BY a.name ASC, a.id ASC");
    qb
}

/// `SELECT` for a principal's recipes with the optional id-list filters
/// applied as independent `EXISTS` conditions (AND-ed).
pub fn recipe_list_query(filter: &RecipeFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT r.id, r.user_id, r.title, r.time_minutes, r.price, r.link, r.image \
         FROM recipes r WHERE r.user_id = ",
    );
    qb.push_bind(filter.owner);
    for (kind, ids) in [
        (AttributeKind::Tag, &filter.tags),
        (AttributeKind::Ingredient, &filter.ingredients),
    ] {
        if let Some(ids) = ids {
            qb.push(format!(
                " AND EXISTS (SELECT 1 FROM {link} l WHERE l.recipe_id = r.id AND l.{col} = ANY(",
                link = kind.link_table(),
                col = kind.link_column()
            ));
            qb.push_bind(ids.clone());
            qb.push("))");
        }
    }
    qb.push(" ORDER BY r.id DESC");
    qb
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn recipe(owner: i64, tags: &[i64], ingredients: &[i64]) -> Recipe {
        Recipe {
            id: 1,
            user_id: owner,
            title: "Sample recipe".into(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            link: None,
            image: None,
            tags: tags.to_vec(),
            ingredients: ingredients.to_vec(),
        }
    }

    #[test]
    fn id_list_parses_and_dedupes() {
        assert_eq!(parse_id_list("3,1, 2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("7").unwrap(), vec![7]);
    }

    #[test]
    fn id_list_rejects_non_integers() {
        for raw in ["foo", "1,foo", "", "1,,2", "1.5"] {
            let err = parse_id_list(raw).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "{raw:?}");
        }
    }

    #[test]
    fn flag_values() {
        assert!(!flag_enabled(None));
        assert!(!flag_enabled(Some("")));
        assert!(!flag_enabled(Some("0")));
        assert!(!flag_enabled(Some(" 00 ")));
        assert!(flag_enabled(Some("1")));
        assert!(flag_enabled(Some("true")));
        assert!(flag_enabled(Some("yes")));
    }

    #[test]
    fn attribute_filter_admits_owned_rows() {
        let all = AttributeFilter::new(1, None);
        assert!(all.admits(1, false));
        assert!(all.admits(1, true));
        assert!(!all.admits(2, true));

        let assigned = AttributeFilter::new(1, Some("1"));
        assert!(assigned.admits(1, true));
        assert!(!assigned.admits(1, false));
        assert!(!assigned.admits(2, true));
    }

    #[test]
    fn recipe_filter_intersects_and_ands() {
        let f = RecipeFilter::new(1, Some("1,2"), None).unwrap();
        assert!(f.matches(&recipe(1, &[2, 9], &[])));
        assert!(!f.matches(&recipe(1, &[3], &[])));
        assert!(!f.matches(&recipe(1, &[], &[])));
        assert!(!f.matches(&recipe(2, &[1], &[])));

        let both = RecipeFilter::new(1, Some("1"), Some("5")).unwrap();
        assert!(both.matches(&recipe(1, &[1], &[5])));
        assert!(!both.matches(&recipe(1, &[1], &[6])));
        assert!(!both.matches(&recipe(1, &[2], &[5])));

        let none = RecipeFilter::new(1, None, None).unwrap();
        assert!(none.matches(&recipe(1, &[], &[])));
    }

    #[test]
    fn recipe_filter_rejects_bad_tokens() {
        assert!(RecipeFilter::new(1, Some("foo"), None).is_err());
        assert!(RecipeFilter::new(1, None, Some("1,x")).is_err());
    }

    #[test]
    fn attribute_query_scopes_by_owner() {
        let qb = attribute_list_query(AttributeKind::Tag, &AttributeFilter::new(4, None));
        let sql = qb.sql();
        assert!(sql.contains("FROM tags a WHERE a.user_id = $1"));
        assert!(!sql.contains("EXISTS"));
        assert!(sql.ends_with("ORDER BY a.name ASC, a.id ASC"));
    }

    #[test]
    fn assigned_only_uses_existence_subquery() {
        let qb = attribute_list_query(AttributeKind::Ingredient, &AttributeFilter::new(4, Some("1")));
        let sql = qb.sql();
        assert!(sql.contains("FROM ingredients a"));
        assert!(sql.contains(
            "EXISTS (SELECT 1 FROM recipe_ingredients l WHERE l.ingredient_id = a.id)"
        ));
        assert!(!sql.contains("JOIN"));
    }

    #[test]
    fn recipe_query_binds_each_filter() {
        let plain = recipe_list_query(&RecipeFilter::new(1, None, None).unwrap());
        assert!(plain.sql().contains("WHERE r.user_id = $1 ORDER BY r.id DESC"));

        let filtered = recipe_list_query(&RecipeFilter::new(1, Some("1,2"), Some("3")).unwrap());
        let sql = filtered.sql();
        assert!(sql.contains("FROM recipe_tags l WHERE l.recipe_id = r.id AND l.tag_id = ANY($2)"));
        assert!(sql.contains(
            "FROM recipe_ingredients l WHERE l.recipe_id = r.id AND l.ingredient_id = ANY($3)"
        ));
    }
}
