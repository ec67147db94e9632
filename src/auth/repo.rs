use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User};
use crate::error::AppError;

/// Backing storage for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    /// Fails with `AppError::Conflict` when the email is already taken.
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, admin, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, admin, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, admin, created_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::Conflict("email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryUserStore;

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::UserStore;
    use crate::auth::repo_types::{NewUser, User};
    use crate::error::AppError;

    /// Map-backed store standing in for PostgreSQL in tests.
    #[derive(Default)]
    pub struct MemoryUserStore {
        inner: Mutex<(i64, HashMap<i64, User>)>,
    }

    impl MemoryUserStore {
        pub fn remove(&self, id: i64) -> Option<User> {
            self.inner.lock().unwrap().1.remove(&id)
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
            let guard = self.inner.lock().unwrap();
            Ok(guard.1.values().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
            Ok(self.inner.lock().unwrap().1.get(&id).cloned())
        }

        async fn insert(&self, user: NewUser) -> Result<User, AppError> {
            let mut guard = self.inner.lock().unwrap();
            if guard.1.values().any(|u| u.email == user.email) {
                return Err(AppError::Conflict("email already registered".into()));
            }
            guard.0 += 1;
            let row = User {
                id: guard.0,
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                admin: false,
                created_at: OffsetDateTime::now_utc(),
            };
            guard.1.insert(row.id, row.clone());
            Ok(row)
        }
    }
}
