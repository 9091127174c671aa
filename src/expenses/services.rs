use std::sync::Arc;

use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use super::{
    overview::{summarize, Overview, Period, Window},
    repo::ExpenseStore,
    repo_types::{Expense, ExpenseFields, ExpenseFilter},
};
use crate::{
    categories::repo::CategoryStore,
    db::Page,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct ExpenseService {
    expenses: Arc<dyn ExpenseStore>,
    categories: Arc<dyn CategoryStore>,
}

impl ExpenseService {
    pub fn new(expenses: Arc<dyn ExpenseStore>, categories: Arc<dyn CategoryStore>) -> Self {
        Self {
            expenses,
            categories,
        }
    }

    /// Deleted and foreign categories look the same as missing ones.
    async fn ensure_category(&self, user_id: i64, category_id: i64) -> AppResult<()> {
        match self.categories.find_owned(user_id, category_id).await? {
            Some(c) if c.state.is_active() => Ok(()),
            _ => {
                warn!(user_id, category_id, "expense against unknown category");
                Err(AppError::NotFound("Category not found"))
            }
        }
    }

    pub async fn create(&self, user_id: i64, fields: &ExpenseFields) -> AppResult<Expense> {
        self.ensure_category(user_id, fields.category_id).await?;
        let expense = self
            .expenses
            .create(user_id, fields, OffsetDateTime::now_utc())
            .await?;
        info!(user_id, expense_id = expense.id, "expense created");
        Ok(expense)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> AppResult<Expense> {
        self.expenses
            .find_owned(user_id, id)
            .await?
            .ok_or(AppError::NotFound("Expense not found"))
    }

    pub async fn list(
        &self,
        user_id: i64,
        page: Page,
        date: Option<Date>,
        categories: Vec<i64>,
    ) -> AppResult<Vec<Expense>> {
        let window = date.map(Window::day).transpose()?;
        let filter = ExpenseFilter {
            page,
            window,
            categories,
        };
        Ok(self.expenses.list(user_id, &filter).await?)
    }

    pub async fn update(&self, user_id: i64, id: i64, fields: &ExpenseFields) -> AppResult<Expense> {
        self.ensure_category(user_id, fields.category_id).await?;
        let expense = self
            .expenses
            .update(user_id, id, fields, OffsetDateTime::now_utc())
            .await?
            .ok_or(AppError::NotFound("Expense not found"))?;
        info!(user_id, expense_id = id, "expense updated");
        Ok(expense)
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> AppResult<()> {
        if !self
            .expenses
            .soft_delete(user_id, id, OffsetDateTime::now_utc())
            .await?
        {
            return Err(AppError::NotFound("Expense not found"));
        }
        info!(user_id, expense_id = id, "expense deleted");
        Ok(())
    }

    /// `date` defaults to `today` (UTC).
    pub async fn overview(
        &self,
        user_id: i64,
        period: &str,
        date: Option<Date>,
        today: Date,
    ) -> AppResult<Overview> {
        let period: Period = period.parse()?;
        let window = period.window(date.unwrap_or(today))?;
        debug!(user_id, ?period, start = %window.start, end = %window.end, "overview");

        let rows = self.expenses.overview_by_category(user_id, &window).await?;
        Ok(summarize(period, rows)?)
    }
}
