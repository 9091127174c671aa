use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::{
    auth::{
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::{NewUser, UserRole, UserView},
    },
    db::StoreError,
    error::{AppError, AppResult},
};

pub const PASSWORD_MIN_LEN: usize = 3;
pub const PASSWORD_MAX_LEN: usize = 255;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_password(password: &str) -> AppResult<()> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(AppError::validation(format!(
            "password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// Sign-up, sign-in and profile reads over a `UserStore`.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn create_user(&self, email: &str, password: &str) -> AppResult<i64> {
        if self.users.find_by_email(email).await?.is_some() {
            warn!(email, "email already registered");
            return Err(AppError::DuplicateEmail);
        }

        let hash = hash_password(password)?;

        let user = self
            .users
            .create(NewUser {
                email,
                password_hash: &hash,
                role: UserRole::User,
            })
            .await
            .map_err(|e| match e {
                // lost a race with a concurrent sign-up
                StoreError::Conflict => AppError::DuplicateEmail,
                other => other.into(),
            })?;

        info!(user_id = user.id, "user registered");
        Ok(user.id)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<UserView> {
        let mut user = match self.users.find_by_email(email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(email, "sign-in with unknown email");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "find_by_email failed during sign-in");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = user.id, "sign-in with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let now = OffsetDateTime::now_utc();
        self.users.update_last_login(user.id, now).await?;
        user.last_login_at = Some(now);

        info!(user_id = user.id, "user signed in");
        Ok(UserView::from(&user))
    }

    pub async fn get_user_by_id(&self, id: i64) -> AppResult<UserView> {
        self.users
            .find_by_id(id)
            .await?
            .map(|u| UserView::from(&u))
            .ok_or(AppError::NotFound("User not found"))
    }

    pub async fn change_password(&self, id: i64, current: &str, new: &str) -> AppResult<()> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User not found"))?;

        if !verify_password(current, &user.password_hash) {
            warn!(user_id = id, "password change with wrong current password");
            return Err(AppError::InvalidCredentials);
        }

        let hash = hash_password(new)?;
        self.users.update_password(id, &hash).await?;
        info!(user_id = id, "password changed");
        Ok(())
    }
}
