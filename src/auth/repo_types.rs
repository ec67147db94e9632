use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String, // unique
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never serialized
    pub admin: bool,
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user. The hash is computed before it gets here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}
