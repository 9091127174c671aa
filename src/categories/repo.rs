use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::repo_types::{Category, CategoryFields, CategoryFilter, CategoryRow};
use crate::db::StoreResult;

/// Every read is scoped to the owner and skips soft-deleted rows.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// `StoreError::Conflict` when the owner already has an active category
    /// with that name.
    async fn create(
        &self,
        user_id: i64,
        fields: &CategoryFields,
        at: OffsetDateTime,
    ) -> StoreResult<Category>;

    async fn find_owned(&self, user_id: i64, id: i64) -> StoreResult<Option<Category>>;

    async fn list(&self, user_id: i64, filter: &CategoryFilter) -> StoreResult<Vec<Category>>;

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        fields: &CategoryFields,
        at: OffsetDateTime,
    ) -> StoreResult<Option<Category>>;

    /// Returns false when nothing active matched.
    async fn soft_delete(&self, user_id: i64, id: i64, at: OffsetDateTime) -> StoreResult<bool>;
}

const CATEGORY_COLUMNS: &str = "id, user_id, name, description, created_at, updated_at, deleted_at";

/// `%term%` for ILIKE with the wildcard characters of the term escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Clone)]
pub struct PgCategoryStore {
    db: PgPool,
}

impl PgCategoryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn create(
        &self,
        user_id: i64,
        fields: &CategoryFields,
        at: OffsetDateTime,
    ) -> StoreResult<Category> {
        let sql = format!(
            r#"
            INSERT INTO categories (user_id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(user_id)
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(at)
            .fetch_one(&self.db)
            .await?;
        Ok(row.into())
    }

    async fn find_owned(&self, user_id: i64, id: i64) -> StoreResult<Option<Category>> {
        let sql = format!(
            r#"
            SELECT {CATEGORY_COLUMNS}
            FROM categories
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Category::from))
    }

    async fn list(&self, user_id: i64, filter: &CategoryFilter) -> StoreResult<Vec<Category>> {
        let sql = format!(
            r#"
            SELECT {CATEGORY_COLUMNS}
            FROM categories
            WHERE user_id = $1
              AND deleted_at IS NULL
              AND ($2::TEXT IS NULL OR name ILIKE $2)
            ORDER BY name ASC, id ASC
            LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(user_id)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(filter.page.limit)
            .bind(filter.page.offset())
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        fields: &CategoryFields,
        at: OffsetDateTime,
    ) -> StoreResult<Option<Category>> {
        let sql = format!(
            r#"
            UPDATE categories
            SET name = $1, description = $2, updated_at = $3
            WHERE id = $4 AND user_id = $5 AND deleted_at IS NULL
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(at)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Category::from))
    }

    async fn soft_delete(&self, user_id: i64, id: i64, at: OffsetDateTime) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE categories
            SET deleted_at = $1, updated_at = $1
            WHERE id = $2 AND user_id = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(at)
        .bind(id)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
