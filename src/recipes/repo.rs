use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder};

use super::repo_types::{NewRecipe, Recipe, RecipeChanges, RecipeRow};
use crate::{
    db::PgStore,
    filters::{recipe_list_query, RecipeFilter},
    taxonomy::repo_types::AttributeKind,
};

#[async_trait]
pub trait RecipeRepo: Send + Sync {
    async fn list_recipes(&self, filter: &RecipeFilter) -> anyhow::Result<Vec<Recipe>>;

    /// Lookup by id and owner in one step.
    async fn find_recipe(&self, owner: i64, id: i64) -> anyhow::Result<Option<Recipe>>;

    /// Insert the row and its links atomically.
    async fn create_recipe(&self, owner: i64, new: NewRecipe) -> anyhow::Result<Recipe>;

    /// Apply `changes` atomically; `None` when no owned row matched.
    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> anyhow::Result<Option<Recipe>>;

    /// Remove the recipe and its links, returning what was removed.
    async fn delete_recipe(&self, owner: i64, id: i64) -> anyhow::Result<Option<Recipe>>;

    /// Point the recipe at a newly stored image, returning it with the key it
    /// replaced. The old key is read under the same row lock as the write.
    /// Touches nothing else.
    async fn swap_recipe_image(
        &self,
        owner: i64,
        id: i64,
        image: &str,
    ) -> anyhow::Result<Option<(Recipe, Option<String>)>>;
}

const RECIPE_COLUMNS: &str = "id, user_id, title, time_minutes, price, link, image";

/// Replace the full link set of one kind for a recipe.
async fn replace_links(
    conn: &mut PgConnection,
    kind: AttributeKind,
    recipe_id: i64,
    ids: &[i64],
) -> anyhow::Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        kind.link_table()
    ))
    .bind(recipe_id)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("clear {}", kind.link_table()))?;

    if ids.is_empty() {
        return Ok(());
    }

    sqlx::query(&format!(
        "INSERT INTO {link} (recipe_id, {col}) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
        link = kind.link_table(),
        col = kind.link_column()
    ))
    .bind(recipe_id)
    .bind(ids)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("insert {}", kind.link_table()))?;
    Ok(())
}

impl PgStore {
    async fn load_links(
        &self,
        kind: AttributeKind,
        recipe_ids: &[i64],
    ) -> anyhow::Result<HashMap<i64, Vec<i64>>> {
        let rows = sqlx::query_as::<_, (i64, i64)>(&format!(
            "SELECT recipe_id, {col} FROM {link} WHERE recipe_id = ANY($1) ORDER BY recipe_id, {col}",
            link = kind.link_table(),
            col = kind.link_column()
        ))
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("load {}", kind.link_table()))?;

        let mut links: HashMap<i64, Vec<i64>> = HashMap::new();
        for (recipe_id, id) in rows {
            links.entry(recipe_id).or_default().push(id);
        }
        Ok(links)
    }

    async fn attach_links(&self, rows: Vec<RecipeRow>) -> anyhow::Result<Vec<Recipe>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut tags = self.load_links(AttributeKind::Tag, &ids).await?;
        let mut ingredients = self.load_links(AttributeKind::Ingredient, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                row.with_links(
                    tags.remove(&id).unwrap_or_default(),
                    ingredients.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }
}

#[async_trait]
impl RecipeRepo for PgStore {
    async fn list_recipes(&self, filter: &RecipeFilter) -> anyhow::Result<Vec<Recipe>> {
        let mut qb = recipe_list_query(filter);
        let rows = qb
            .build_query_as::<RecipeRow>()
            .fetch_all(&self.pool)
            .await
            .context("list recipes")?;
        self.attach_links(rows).await
    }

    async fn find_recipe(&self, owner: i64, id: i64) -> anyhow::Result<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .context("find recipe")?;

        match row {
            Some(row) => Ok(self.attach_links(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create_recipe(&self, owner: i64, new: NewRecipe) -> anyhow::Result<Recipe> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO recipes (user_id, title, time_minutes, price, link)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(&new.title)
        .bind(new.time_minutes)
        .bind(new.price)
        .bind(&new.link)
        .fetch_one(&mut *tx)
        .await
        .context("insert recipe")?;

        replace_links(&mut tx, AttributeKind::Tag, id, &new.tags).await?;
        replace_links(&mut tx, AttributeKind::Ingredient, id, &new.ingredients).await?;
        tx.commit().await.context("commit tx")?;

        self.find_recipe(owner, id)
            .await?
            .context("recipe vanished after insert")
    }

    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> anyhow::Result<Option<Recipe>> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await
                .context("lock recipe")?;
        if locked.is_none() {
            return Ok(None);
        }

        if changes.touches_columns() {
            let mut qb = QueryBuilder::<sqlx::Postgres>::new("UPDATE recipes SET ");
            let mut set = qb.separated(", ");
            if let Some(title) = &changes.title {
                set.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(minutes) = changes.time_minutes {
                set.push("time_minutes = ").push_bind_unseparated(minutes);
            }
            if let Some(price) = changes.price {
                set.push("price = ").push_bind_unseparated(price);
            }
            if let Some(link) = &changes.link {
                set.push("link = ").push_bind_unseparated(link.clone());
            }
            qb.push(" WHERE id = ").push_bind(id);
            qb.build()
                .execute(&mut *tx)
                .await
                .context("update recipe")?;
        }

        if let Some(tags) = &changes.tags {
            replace_links(&mut tx, AttributeKind::Tag, id, tags).await?;
        }
        if let Some(ingredients) = &changes.ingredients {
            replace_links(&mut tx, AttributeKind::Ingredient, id, ingredients).await?;
        }
        tx.commit().await.context("commit tx")?;

        self.find_recipe(owner, id).await
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> anyhow::Result<Option<Recipe>> {
        let Some(recipe) = self.find_recipe(owner, id).await? else {
            return Ok(None);
        };
        // junction rows go with it (ON DELETE CASCADE)
        let res = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .context("delete recipe")?;
        Ok((res.rows_affected() > 0).then_some(recipe))
    }

    async fn swap_recipe_image(
        &self,
        owner: i64,
        id: i64,
        image: &str,
    ) -> anyhow::Result<Option<(Recipe, Option<String>)>> {
        let previous: Option<Option<String>> = sqlx::query_scalar(
            r#"
            UPDATE recipes r
               SET image = $3
              FROM (SELECT id, image FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE) old
             WHERE r.id = old.id
            RETURNING old.image
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(image)
        .fetch_optional(&self.pool)
        .await
        .context("swap recipe image")?;

        let Some(previous) = previous else {
            return Ok(None);
        };
        Ok(self
            .find_recipe(owner, id)
            .await?
            .map(|recipe| (recipe, previous)))
    }
}
