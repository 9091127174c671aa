use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::{
    overview::{CategoryTotal, Window},
    repo_types::{Expense, ExpenseFields, ExpenseFilter, ExpenseRow},
};
use crate::db::StoreResult;

/// Expenses scoped to their owner. Soft-deleted expenses are never returned.
///
/// Category ownership is checked by the caller before `create`/`update`.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn create(
        &self,
        user_id: i64,
        fields: &ExpenseFields,
        at: OffsetDateTime,
    ) -> StoreResult<Expense>;

    async fn find_owned(&self, user_id: i64, id: i64) -> StoreResult<Option<Expense>>;

    async fn list(&self, user_id: i64, filter: &ExpenseFilter) -> StoreResult<Vec<Expense>>;

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        fields: &ExpenseFields,
        at: OffsetDateTime,
    ) -> StoreResult<Option<Expense>>;

    async fn soft_delete(&self, user_id: i64, id: i64, at: OffsetDateTime) -> StoreResult<bool>;

    /// Sum and count of active expenses in `window`, grouped by the owner's
    /// active categories.
    async fn overview_by_category(
        &self,
        user_id: i64,
        window: &Window,
    ) -> StoreResult<Vec<CategoryTotal>>;
}

const EXPENSE_SELECT: &str = r#"
    SELECT e.id, e.category_id, c.name AS category_name, e.amount,
           e.description, e.created_at, e.updated_at
"#;

#[derive(Clone)]
pub struct PgExpenseStore {
    db: PgPool,
}

impl PgExpenseStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ExpenseStore for PgExpenseStore {
    async fn create(
        &self,
        user_id: i64,
        fields: &ExpenseFields,
        at: OffsetDateTime,
    ) -> StoreResult<Expense> {
        let sql = format!(
            r#"
            WITH e AS (
                INSERT INTO expenses (user_id, category_id, amount, description, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $5)
                RETURNING *
            )
            {EXPENSE_SELECT}
            FROM e
            JOIN categories c ON c.id = e.category_id
            "#
        );
        let row = sqlx::query_as::<_, ExpenseRow>(&sql)
            .bind(user_id)
            .bind(fields.category_id)
            .bind(fields.amount)
            .bind(&fields.description)
            .bind(at)
            .fetch_one(&self.db)
            .await?;
        Ok(row.into())
    }

    async fn find_owned(&self, user_id: i64, id: i64) -> StoreResult<Option<Expense>> {
        let sql = format!(
            r#"
            {EXPENSE_SELECT}
            FROM expenses e
            JOIN categories c ON c.id = e.category_id
            WHERE e.id = $1 AND e.user_id = $2 AND e.deleted_at IS NULL
            "#
        );
        let row = sqlx::query_as::<_, ExpenseRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Expense::from))
    }

    async fn list(&self, user_id: i64, filter: &ExpenseFilter) -> StoreResult<Vec<Expense>> {
        let sql = format!(
            r#"
            {EXPENSE_SELECT}
            FROM expenses e
            JOIN categories c ON c.id = e.category_id
            WHERE e.user_id = $1
              AND e.deleted_at IS NULL
              AND ($2::TIMESTAMPTZ IS NULL OR e.created_at >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR e.created_at < $3)
              AND (cardinality($4::BIGINT[]) = 0 OR e.category_id = ANY($4))
            ORDER BY e.created_at DESC, e.id DESC
            LIMIT $5 OFFSET $6
            "#
        );
        let rows = sqlx::query_as::<_, ExpenseRow>(&sql)
            .bind(user_id)
            .bind(filter.window.map(|w| w.start))
            .bind(filter.window.map(|w| w.end))
            .bind(&filter.categories)
            .bind(filter.page.limit)
            .bind(filter.page.offset())
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Expense::from).collect())
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        fields: &ExpenseFields,
        at: OffsetDateTime,
    ) -> StoreResult<Option<Expense>> {
        let sql = format!(
            r#"
            WITH e AS (
                UPDATE expenses
                SET category_id = $1, amount = $2, description = $3, updated_at = $4
                WHERE id = $5 AND user_id = $6 AND deleted_at IS NULL
                RETURNING *
            )
            {EXPENSE_SELECT}
            FROM e
            JOIN categories c ON c.id = e.category_id
            "#
        );
        let row = sqlx::query_as::<_, ExpenseRow>(&sql)
            .bind(fields.category_id)
            .bind(fields.amount)
            .bind(&fields.description)
            .bind(at)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Expense::from))
    }

    async fn soft_delete(&self, user_id: i64, id: i64, at: OffsetDateTime) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE expenses
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

    async fn overview_by_category(
        &self,
        user_id: i64,
        window: &Window,
    ) -> StoreResult<Vec<CategoryTotal>> {
        // SUM(bigint) is NUMERIC in Postgres
        let rows = sqlx::query_as::<_, CategoryTotal>(
            r#"
            SELECT c.id AS category_id,
                   c.name AS category_name,
                   SUM(e.amount)::BIGINT AS total_amount,
                   COUNT(e.id) AS count
            FROM expenses e
            JOIN categories c ON c.id = e.category_id AND c.deleted_at IS NULL
            WHERE e.user_id = $1
              AND c.user_id = $1
              AND e.deleted_at IS NULL
              AND e.created_at >= $2
              AND e.created_at < $3
            GROUP BY c.id, c.name
            ORDER BY total_amount DESC, c.id ASC
            "#,
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
