use sqlx::FromRow;
use time::OffsetDateTime;

use super::overview::Window;
use crate::db::Page;

/// Active expense joined with the name of its category. Stores only ever
/// return rows the caller owns.
#[derive(Debug, FromRow)]
pub struct ExpenseRow {
    pub id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub amount: i64,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Expense {
    pub id: i64,
    pub category: CategoryRef,
    /// cents
    pub amount: i64,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<ExpenseRow> for Expense {
    fn from(r: ExpenseRow) -> Self {
        Self {
            id: r.id,
            category: CategoryRef {
                id: r.category_id,
                name: r.category_name,
            },
            amount: r.amount,
            description: r.description,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseFields {
    pub category_id: i64,
    /// cents, never negative
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub page: Page,
    pub window: Option<Window>,
    /// empty means every category
    pub categories: Vec<i64>,
}
