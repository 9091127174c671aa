use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Expense, ExpenseFields};
use crate::{
    api::parse_id,
    error::{AppError, AppResult},
};

/// Largest accepted single amount: one trillion in display units.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000_000;

/// Decimal amount from a request body to whole cents, truncating fractions
/// of a cent.
pub fn to_cents(amount: f64) -> AppResult<i64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::validation("amount must be a non-negative number"));
    }
    let cents = (amount * 100.0).trunc();
    // exact in f64, so the cast below never saturates
    if cents > MAX_AMOUNT_CENTS as f64 {
        return Err(AppError::validation("amount is too large"));
    }
    Ok(cents as i64)
}

pub fn cents_to_display(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    pub amount: f64,
    #[serde(alias = "category_id")]
    pub category_id: i64,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExpenseRequest {
    pub fn validate(self) -> AppResult<ExpenseFields> {
        if self.category_id <= 0 {
            return Err(AppError::validation("Failed to parse categoryId"));
        }
        Ok(ExpenseFields {
            category_id: self.category_id,
            amount: to_cents(self.amount)?,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }
}

/// Read with `axum_extra`'s `Query` so `category` may repeat. Both the
/// plain and the `category[]` spelling are accepted, also mixed.
#[derive(Debug, Default, Deserialize)]
pub struct ListExpensesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub date: Option<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default, rename = "category[]")]
    pub category_brackets: Vec<String>,
}

impl ListExpensesQuery {
    pub fn category_ids(&self) -> AppResult<Vec<i64>> {
        self.category
            .iter()
            .chain(&self.category_brackets)
            .map(|raw| parse_id(raw, "category"))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub period: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseView {
    pub id: i64,
    pub amount: f64,
    pub category_id: i64,
    pub category_name: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&Expense> for ExpenseView {
    fn from(e: &Expense) -> Self {
        Self {
            id: e.id,
            amount: cents_to_display(e.amount),
            category_id: e.category.id,
            category_name: e.category.name.clone(),
            description: e.description.clone(),
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedExpenseResponse {
    pub expense: ExpenseView,
}
