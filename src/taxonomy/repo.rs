use anyhow::Context;
use async_trait::async_trait;

use super::repo_types::{Attribute, AttributeKind};
use crate::{
    db::PgStore,
    filters::{attribute_list_query, AttributeFilter},
};

#[async_trait]
pub trait AttributeRepo: Send + Sync {
    async fn list_attributes(
        &self,
        kind: AttributeKind,
        filter: &AttributeFilter,
    ) -> anyhow::Result<Vec<Attribute>>;

    async fn create_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        name: &str,
    ) -> anyhow::Result<Attribute>;

    /// Lookup by id and owner in one step.
    async fn find_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> anyhow::Result<Option<Attribute>>;

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
        name: &str,
    ) -> anyhow::Result<Option<Attribute>>;

    /// `false` when no owned row matched.
    async fn delete_attribute(&self, kind: AttributeKind, owner: i64, id: i64)
        -> anyhow::Result<bool>;

    /// Rows with the given ids regardless of owner, ordered by id.
    async fn attributes_by_ids(
        &self,
        kind: AttributeKind,
        ids: &[i64],
    ) -> anyhow::Result<Vec<Attribute>>;
}

#[async_trait]
impl AttributeRepo for PgStore {
    async fn list_attributes(
        &self,
        kind: AttributeKind,
        filter: &AttributeFilter,
    ) -> anyhow::Result<Vec<Attribute>> {
        let mut qb = attribute_list_query(kind, filter);
        let rows = qb
            .build_query_as::<Attribute>()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("list {}", kind.table()))?;
        Ok(rows)
    }

    async fn create_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        name: &str,
    ) -> anyhow::Result<Attribute> {
        let row = sqlx::query_as::<_, Attribute>(&format!(
            "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
            kind.table()
        ))
        .bind(owner)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("insert into {}", kind.table()))?;
        Ok(row)
    }

    async fn find_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> anyhow::Result<Option<Attribute>> {
        let row = sqlx::query_as::<_, Attribute>(&format!(
            "SELECT id, user_id, name FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("find in {}", kind.table()))?;
        Ok(row)
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
        name: &str,
    ) -> anyhow::Result<Option<Attribute>> {
        let row = sqlx::query_as::<_, Attribute>(&format!(
            "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, user_id, name",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("update {}", kind.table()))?;
        Ok(row)
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> anyhow::Result<bool> {
        // junction rows go with it (ON DELETE CASCADE)
        let res = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .with_context(|| format!("delete from {}", kind.table()))?;
        Ok(res.rows_affected() > 0)
    }

    async fn attributes_by_ids(
        &self,
        kind: AttributeKind,
        ids: &[i64],
    ) -> anyhow::Result<Vec<Attribute>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, Attribute>(&format!(
            "SELECT id, user_id, name FROM {} WHERE id = ANY($1) ORDER BY id",
            kind.table()
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("load {} by ids", kind.table()))?;
        Ok(rows)
    }
}
