use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User};
use crate::error::AppError;

const MIN_PASSWORD_LEN: usize = 8;
const MIN_NAME_LEN: usize = 3;

/// Dot-atom local part and domain: non-empty labels, no leading, trailing
/// or doubled dots. Single-label domains (`a@localhost`) are accepted.
pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*$"
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

lazy_static! {
    /// Verified against when the email is unknown so both login failures
    /// cost one Argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("gymlog-dummy-password").ok();
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("password too short (min {MIN_PASSWORD_LEN} characters)"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> Result<(), AppError> {
    if name.chars().count() < MIN_NAME_LEN {
        return Err(AppError::validation(
            "name",
            format!("name too short (min {MIN_NAME_LEN} characters)"),
        ));
    }
    Ok(())
}

/// Owns user identity and password checks. Password hashes never leave
/// this type except inside `User`, which does not serialize them.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn UserStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<i64, AppError> {
        let email = normalize_email(email);
        let name = name.trim();

        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::validation("email", "email invalid"));
        }
        validate_password(password)?;
        validate_name(name)?;

        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("email already registered".into()));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .store
            .insert(NewUser {
                name: name.to_string(),
                email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user.id)
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<i64, AppError> {
        let email = normalize_email(email);

        let Some(user) = self.store.find_by_email(&email).await? else {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, dummy);
            }
            warn!(email = %email, "login unknown email");
            return Err(AppError::Auth);
        };

        let ok = match verify_password(password, &user.password_hash) {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, user_id = user.id, "stored password hash unreadable");
                false
            }
        };
        if !ok {
            warn!(email = %email, user_id = user.id, "login invalid password");
            return Err(AppError::Auth);
        }

        info!(user_id = user.id, "user logged in");
        Ok(user.id)
    }

    pub async fn load_user(&self, user_id: i64) -> Result<User, AppError> {
        match self.store.find_by_id(user_id).await? {
            Some(user) => Ok(user),
            None => {
                debug!(user_id, "bound user no longer exists");
                Err(AppError::NotFound(format!("user {user_id} not found")))
            }
        }
    }
}
