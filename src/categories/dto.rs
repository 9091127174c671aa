use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Category, CategoryFields};
use crate::error::{AppError, AppResult};

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryRequest {
    pub fn validate(self) -> AppResult<CategoryFields> {
        let name = self.name.trim().to_string();
        let len = name.chars().count();
        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
            return Err(AppError::validation(format!(
                "name must be between {NAME_MIN_LEN} and {NAME_MAX_LEN} characters"
            )));
        }
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(CategoryFields { name, description })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(alias = "s")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&Category> for CategoryView {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            description: c.description.clone(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedCategoryResponse {
    pub category: CategoryView,
}
