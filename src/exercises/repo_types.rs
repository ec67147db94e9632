use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub users: i64, // distinct users who logged it
}

#[derive(Debug, Clone, FromRow)]
pub struct ChartPoint {
    pub logged_at: OffsetDateTime,
    pub reps: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExerciseLog {
    pub user_id: i64,
    pub exercise_id: i64,
    pub weight: f64,
    pub reps: i32,
    pub sets: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Still referenced by logs; left in place.
    InUse,
    Missing,
}
