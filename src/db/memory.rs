//! In-process store used by the HTTP tests.
//!
//! Lists are evaluated with the same filter predicates and ordering as the
//! SQL the Postgres store runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    filters::{AttributeFilter, RecipeFilter},
    recipes::{
        repo::RecipeRepo,
        repo_types::{NewRecipe, Recipe, RecipeChanges},
    },
    taxonomy::{
        repo::AttributeRepo,
        repo_types::{Attribute, AttributeKind},
    },
    users::{
        repo::UserRepo,
        repo_types::{NewUser, User, UserChanges},
    },
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    tags: BTreeMap<i64, Attribute>,
    ingredients: BTreeMap<i64, Attribute>,
    recipes: BTreeMap<i64, Recipe>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn attributes(&self, kind: AttributeKind) -> &BTreeMap<i64, Attribute> {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }

    fn attributes_mut(&mut self, kind: AttributeKind) -> &mut BTreeMap<i64, Attribute> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Ingredient => &mut self.ingredients,
        }
    }

    fn is_linked(&self, kind: AttributeKind, id: i64) -> bool {
        self.recipes.values().any(|r| links(r, kind).contains(&id))
    }
}

fn links(recipe: &Recipe, kind: AttributeKind) -> &Vec<i64> {
    match kind {
        AttributeKind::Tag => &recipe.tags,
        AttributeKind::Ingredient => &recipe.ingredients,
    }
}

fn sorted_set(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the active flag of a user, as an administrator would.
    pub fn set_active(&self, id: i64, active: bool) {
        if let Some(user) = self.tables.lock().unwrap().users.get_mut(&id) {
            user.is_active = active;
        }
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }

    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock().unwrap();
        if t.users.values().any(|u| u.email == new.email) {
            return Ok(None);
        }
        let user = User {
            id: t.next_id(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            is_active: true,
            is_staff: false,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock().unwrap();
        let Some(user) = t.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl AttributeRepo for MemoryStore {
    async fn list_attributes(
        &self,
        kind: AttributeKind,
        filter: &AttributeFilter,
    ) -> anyhow::Result<Vec<Attribute>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<Attribute> = t
            .attributes(kind)
            .values()
            .filter(|a| filter.admits(a.user_id, t.is_linked(kind, a.id)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn create_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        name: &str,
    ) -> anyhow::Result<Attribute> {
        let mut t = self.tables.lock().unwrap();
        let row = Attribute {
            id: t.next_id(),
            user_id: owner,
            name: name.to_string(),
        };
        t.attributes_mut(kind).insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> anyhow::Result<Option<Attribute>> {
        let t = self.tables.lock().unwrap();
        Ok(t.attributes(kind)
            .get(&id)
            .filter(|a| a.user_id == owner)
            .cloned())
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
        name: &str,
    ) -> anyhow::Result<Option<Attribute>> {
        let mut t = self.tables.lock().unwrap();
        match t.attributes_mut(kind).get_mut(&id) {
            Some(row) if row.user_id == owner => {
                row.name = name.to_string();
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let owned = t
            .attributes(kind)
            .get(&id)
            .is_some_and(|a| a.user_id == owner);
        if !owned {
            return Ok(false);
        }
        t.attributes_mut(kind).remove(&id);
        for recipe in t.recipes.values_mut() {
            match kind {
                AttributeKind::Tag => recipe.tags.retain(|x| *x != id),
                AttributeKind::Ingredient => recipe.ingredients.retain(|x| *x != id),
            }
        }
        Ok(true)
    }

    async fn attributes_by_ids(
        &self,
        kind: AttributeKind,
        ids: &[i64],
    ) -> anyhow::Result<Vec<Attribute>> {
        let t = self.tables.lock().unwrap();
        Ok(sorted_set(ids)
            .into_iter()
            .filter_map(|id| t.attributes(kind).get(&id).cloned())
            .collect())
    }
}

#[async_trait]
impl RecipeRepo for MemoryStore {
    async fn list_recipes(&self, filter: &RecipeFilter) -> anyhow::Result<Vec<Recipe>> {
        let t = self.tables.lock().unwrap();
        Ok(t.recipes
            .values()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn find_recipe(&self, owner: i64, id: i64) -> anyhow::Result<Option<Recipe>> {
        let t = self.tables.lock().unwrap();
        Ok(t.recipes.get(&id).filter(|r| r.user_id == owner).cloned())
    }

    async fn create_recipe(&self, owner: i64, new: NewRecipe) -> anyhow::Result<Recipe> {
        let mut t = self.tables.lock().unwrap();
        let recipe = Recipe {
            id: t.next_id(),
            user_id: owner,
            title: new.title,
            time_minutes: new.time_minutes,
            price: new.price,
            link: new.link,
            image: None,
            tags: sorted_set(&new.tags),
            ingredients: sorted_set(&new.ingredients),
        };
        t.recipes.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> anyhow::Result<Option<Recipe>> {
        let mut t = self.tables.lock().unwrap();
        let Some(recipe) = t.recipes.get_mut(&id).filter(|r| r.user_id == owner) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            recipe.title = title;
        }
        if let Some(minutes) = changes.time_minutes {
            recipe.time_minutes = minutes;
        }
        if let Some(price) = changes.price {
            recipe.price = price;
        }
        if let Some(link) = changes.link {
            recipe.link = link;
        }
        if let Some(tags) = changes.tags {
            recipe.tags = sorted_set(&tags);
        }
        if let Some(ingredients) = changes.ingredients {
            recipe.ingredients = sorted_set(&ingredients);
        }
        Ok(Some(recipe.clone()))
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> anyhow::Result<Option<Recipe>> {
        let mut t = self.tables.lock().unwrap();
        if !t.recipes.get(&id).is_some_and(|r| r.user_id == owner) {
            return Ok(None);
        }
        Ok(t.recipes.remove(&id))
    }

    async fn swap_recipe_image(
        &self,
        owner: i64,
        id: i64,
        image: &str,
    ) -> anyhow::Result<Option<(Recipe, Option<String>)>> {
        let mut t = self.tables.lock().unwrap();
        let Some(recipe) = t.recipes.get_mut(&id).filter(|r| r.user_id == owner) else {
            return Ok(None);
        };
        let previous = std::mem::replace(&mut recipe.image, Some(image.to_string()));
        Ok(Some((recipe.clone(), previous)))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn soup(tags: Vec<i64>, ingredients: Vec<i64>) -> NewRecipe {
        NewRecipe {
            title: "Soup".into(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            link: Some("https://example.com".into()),
            tags,
            ingredients,
        }
    }

    #[tokio::test]
    async fn full_replacement_clears_omitted_links() {
        let store = MemoryStore::new();
        let created = store.create_recipe(1, soup(vec![3, 4], vec![5])).await.unwrap();

        let changes = RecipeChanges::from(soup(vec![], vec![]));
        assert_eq!(changes.tags, Some(vec![]));
        let updated = store
            .update_recipe(1, created.id, changes)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.tags.is_empty());
        assert!(updated.ingredients.is_empty());
    }

    #[tokio::test]
    async fn partial_changes_keep_omitted_links() {
        let store = MemoryStore::new();
        let created = store.create_recipe(1, soup(vec![3], vec![5])).await.unwrap();

        let changes = RecipeChanges {
            tags: Some(vec![4, 4]),
            ..Default::default()
        };
        let updated = store
            .update_recipe(1, created.id, changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.tags, vec![4]);
        assert_eq!(updated.ingredients, vec![5]);
        assert_eq!(updated.link.as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn updates_are_owner_scoped() {
        let store = MemoryStore::new();
        let created = store.create_recipe(1, soup(vec![3], vec![])).await.unwrap();
        let changes = RecipeChanges::from(soup(vec![], vec![]));
        assert!(store.update_recipe(2, created.id, changes).await.unwrap().is_none());
        assert!(store.swap_recipe_image(2, created.id, "k").await.unwrap().is_none());
        assert_eq!(store.find_recipe(1, created.id).await.unwrap().unwrap().tags, vec![3]);
    }

    #[tokio::test]
    async fn image_swap_returns_the_replaced_key() {
        let store = MemoryStore::new();
        let created = store.create_recipe(1, soup(vec![], vec![])).await.unwrap();

        let (recipe, previous) = store.swap_recipe_image(1, created.id, "a.png").await.unwrap().unwrap();
        assert_eq!(recipe.image.as_deref(), Some("a.png"));
        assert_eq!(previous, None);

        let (_, previous) = store.swap_recipe_image(1, created.id, "b.png").await.unwrap().unwrap();
        assert_eq!(previous.as_deref(), Some("a.png"));
    }
}
