//! In-memory stores for service and router tests.

use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    categories::{
        repo::CategoryStore,
        repo_types::{Category, CategoryFields, CategoryFilter},
    },
    db::{Page, RecordState, StoreError, StoreResult},
    expenses::{
        overview::{by_total_desc, CategoryTotal, Window},
        repo::ExpenseStore,
        repo_types::{CategoryRef, Expense, ExpenseFields, ExpenseFilter},
    },
};

#[derive(Debug, Clone)]
struct StoredExpense {
    id: i64,
    user_id: i64,
    category_id: i64,
    amount: i64,
    description: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    state: RecordState,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    expenses: Vec<StoredExpense>,
}

impl Tables {
    fn expense(&self, e: &StoredExpense) -> StoreResult<Expense> {
        let category = self
            .categories
            .iter()
            .find(|c| c.id == e.category_id)
            .ok_or_else(|| anyhow!("expense {} has no category", e.id))?;
        Ok(Expense {
            id: e.id,
            category: CategoryRef {
                id: category.id,
                name: category.name.clone(),
            },
            amount: e.amount,
            description: e.description.clone(),
            created_at: e.created_at,
            updated_at: e.updated_at,
        })
    }

    fn name_taken(&self, user_id: i64, name: &str, except: Option<i64>) -> bool {
        self.categories.iter().any(|c| {
            c.user_id == user_id
                && c.state.is_active()
                && c.name == name
                && Some(c.id) != except
        })
    }
}

/// Mirrors the Postgres stores: per-owner scoping, soft deletes and the
/// unique indexes on email and active category name.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.lock().users.iter().find(|u| u.id == id).cloned()
    }
}

fn paginate<T>(items: Vec<T>, page: &Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, new_user: NewUser<'_>) -> StoreResult<User> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: t.users.len() as i64 + 1,
            email: new_user.email.to_string(),
            password_hash: new_user.password_hash.to_string(),
            role: new_user.role,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.user(id))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_last_login(&self, id: i64, at: OffsetDateTime) -> StoreResult<()> {
        if let Some(u) = self.lock().users.iter_mut().find(|u| u.id == id) {
            u.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()> {
        if let Some(u) = self.lock().users.iter_mut().find(|u| u.id == id) {
            u.password_hash = password_hash.to_string();
            u.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn create(
        &self,
        user_id: i64,
        fields: &CategoryFields,
        at: OffsetDateTime,
    ) -> StoreResult<Category> {
        let mut t = self.lock();
        if t.name_taken(user_id, &fields.name, None) {
            return Err(StoreError::Conflict);
        }
        let category = Category {
            id: t.categories.len() as i64 + 1,
            user_id,
            name: fields.name.clone(),
            description: fields.description.clone(),
            created_at: at,
            updated_at: at,
            state: RecordState::Active,
        };
        t.categories.push(category.clone());
        Ok(category)
    }

    async fn find_owned(&self, user_id: i64, id: i64) -> StoreResult<Option<Category>> {
        Ok(self
            .lock()
            .categories
            .iter()
            .find(|c| c.id == id && c.user_id == user_id && c.state.is_active())
            .cloned())
    }

    async fn list(&self, user_id: i64, filter: &CategoryFilter) -> StoreResult<Vec<Category>> {
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut found: Vec<Category> = self
            .lock()
            .categories
            .iter()
            .filter(|c| c.user_id == user_id && c.state.is_active())
            .filter(|c| match &needle {
                Some(n) => c.name.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paginate(found, &filter.page))
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        fields: &CategoryFields,
        at: OffsetDateTime,
    ) -> StoreResult<Option<Category>> {
        let mut t = self.lock();
        let Some(idx) = t
            .categories
            .iter()
            .position(|c| c.id == id && c.user_id == user_id && c.state.is_active())
        else {
            return Ok(None);
        };
        if t.name_taken(user_id, &fields.name, Some(id)) {
            return Err(StoreError::Conflict);
        }
        let c = &mut t.categories[idx];
        c.name = fields.name.clone();
        c.description = fields.description.clone();
        c.updated_at = at;
        Ok(Some(c.clone()))
    }

    async fn soft_delete(&self, user_id: i64, id: i64, at: OffsetDateTime) -> StoreResult<bool> {
        let mut t = self.lock();
        match t
            .categories
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id && c.state.is_active())
        {
            Some(c) => {
                c.state = RecordState::Deleted { at };
                c.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn create(
        &self,
        user_id: i64,
        fields: &ExpenseFields,
        at: OffsetDateTime,
    ) -> StoreResult<Expense> {
        let mut t = self.lock();
        let stored = StoredExpense {
            id: t.expenses.len() as i64 + 1,
            user_id,
            category_id: fields.category_id,
            amount: fields.amount,
            description: fields.description.clone(),
            created_at: at,
            updated_at: at,
            state: RecordState::Active,
        };
        let expense = t.expense(&stored)?;
        t.expenses.push(stored);
        Ok(expense)
    }

    async fn find_owned(&self, user_id: i64, id: i64) -> StoreResult<Option<Expense>> {
        let t = self.lock();
        t.expenses
            .iter()
            .find(|e| e.id == id && e.user_id == user_id && e.state.is_active())
            .map(|e| t.expense(e))
            .transpose()
    }

    async fn list(&self, user_id: i64, filter: &ExpenseFilter) -> StoreResult<Vec<Expense>> {
        let t = self.lock();
        let mut found: Vec<&StoredExpense> = t
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id && e.state.is_active())
            .filter(|e| filter.window.map_or(true, |w| w.contains(e.created_at)))
            .filter(|e| filter.categories.is_empty() || filter.categories.contains(&e.category_id))
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        paginate(found, &filter.page)
            .into_iter()
            .map(|e| t.expense(e))
            .collect()
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        fields: &ExpenseFields,
        at: OffsetDateTime,
    ) -> StoreResult<Option<Expense>> {
        let mut t = self.lock();
        let Some(e) = t
            .expenses
            .iter_mut()
            .find(|e| e.id == id && e.user_id == user_id && e.state.is_active())
        else {
            return Ok(None);
        };
        e.category_id = fields.category_id;
        e.amount = fields.amount;
        e.description = fields.description.clone();
        e.updated_at = at;
        let e = e.clone();
        t.expense(&e).map(Some)
    }

    async fn soft_delete(&self, user_id: i64, id: i64, at: OffsetDateTime) -> StoreResult<bool> {
        let mut t = self.lock();
        match t
            .expenses
            .iter_mut()
            .find(|e| e.id == id && e.user_id == user_id && e.state.is_active())
        {
            Some(e) => {
                e.state = RecordState::Deleted { at };
                e.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn overview_by_category(
        &self,
        user_id: i64,
        window: &Window,
    ) -> StoreResult<Vec<CategoryTotal>> {
        let t = self.lock();
        let mut totals: Vec<CategoryTotal> = Vec::new();
        for e in t
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id && e.state.is_active() && window.contains(e.created_at))
        {
            let Some(category) = t
                .categories
                .iter()
                .find(|c| c.id == e.category_id && c.user_id == user_id && c.state.is_active())
            else {
                continue;
            };
            match totals.iter_mut().find(|r| r.category_id == category.id) {
                Some(row) => {
                    row.total_amount = row
                        .total_amount
                        .checked_add(e.amount)
                        .ok_or_else(|| anyhow!("bigint out of range"))?;
                    row.count += 1;
                }
                None => totals.push(CategoryTotal {
                    category_id: category.id,
                    category_name: category.name.clone(),
                    total_amount: e.amount,
                    count: 1,
                }),
            }
        }
        totals.sort_by(by_total_desc);
        Ok(totals)
    }
}
