use serde::{Deserialize, Serialize};

use super::repo_types::Attribute;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub assigned_only: Option<String>,
}

/// Create/update body. Only `name` is writable; the owner always comes from
/// the token.
#[derive(Debug, Deserialize)]
pub struct AttributeRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeResponse {
    pub id: i64,
    pub name: String,
}

impl From<Attribute> for AttributeResponse {
    fn from(a: Attribute) -> Self {
        Self { id: a.id, name: a.name }
    }
}
