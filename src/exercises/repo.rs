use sqlx::PgPool;

use super::repo_types::{ChartPoint, DeleteOutcome, Exercise, NewExerciseLog};
use crate::error::AppError;

/// All exercises ordered by name, with how many users have logged each.
pub async fn list_exercises(db: &PgPool) -> Result<Vec<Exercise>, AppError> {
    let rows = sqlx::query_as::<_, Exercise>(
        r#"
        SELECT e.id, e.name, COUNT(DISTINCT l.user_id) AS users
        FROM exercises e
        LEFT JOIN exercise_logs l ON l.exercise_id = e.id
        GROUP BY e.id, e.name
        ORDER BY e.name
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Exercises the user has logged at least once.
pub async fn completed_by_user(db: &PgPool, user_id: i64) -> Result<Vec<Exercise>, AppError> {
    let rows = sqlx::query_as::<_, Exercise>(
        r#"
        SELECT e.id, e.name,
               (SELECT COUNT(DISTINCT l2.user_id)
                FROM exercise_logs l2
                WHERE l2.exercise_id = e.id) AS users
        FROM exercises e
        WHERE EXISTS (
            SELECT 1 FROM exercise_logs l
            WHERE l.exercise_id = e.id AND l.user_id = $1
        )
        ORDER BY e.name
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Distinct weights the user has logged for an exercise, heaviest first.
pub async fn logged_weights(
    db: &PgPool,
    user_id: i64,
    exercise_id: i64,
) -> Result<Vec<f64>, AppError> {
    let rows = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT DISTINCT weight
        FROM exercise_logs
        WHERE exercise_id = $1 AND user_id = $2
        ORDER BY weight DESC
        "#,
    )
    .bind(exercise_id)
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn chart(
    db: &PgPool,
    user_id: i64,
    exercise_id: i64,
    weight: f64,
) -> Result<Vec<ChartPoint>, AppError> {
    let rows = sqlx::query_as::<_, ChartPoint>(
        r#"
        SELECT logged_at, reps
        FROM exercise_logs
        WHERE weight = $1 AND exercise_id = $2 AND user_id = $3
        ORDER BY logged_at
        "#,
    )
    .bind(weight)
    .bind(exercise_id)
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert_log(db: &PgPool, log: &NewExerciseLog) -> Result<i64, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO exercise_logs (user_id, exercise_id, weight, reps, sets)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(log.user_id)
    .bind(log.exercise_id)
    .bind(log.weight)
    .bind(log.reps)
    .bind(log.sets)
    .fetch_one(db)
    .await;

    match id {
        Ok(id) => Ok(id),
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            Err(AppError::NotFound(format!("exercise {} not found", log.exercise_id)))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn insert_exercise(db: &PgPool, name: &str) -> Result<i64, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO exercises (name)
        VALUES ($1)
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(db)
    .await;

    match id {
        Ok(id) => Ok(id),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(AppError::Conflict(format!("exercise {name:?} already exists")))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_exercise(db: &PgPool, id: i64) -> Result<DeleteOutcome, AppError> {
    let res = sqlx::query("DELETE FROM exercises WHERE id = $1")
        .bind(id)
        .execute(db)
        .await;

    match res {
        Ok(done) if done.rows_affected() == 0 => Ok(DeleteOutcome::Missing),
        Ok(_) => Ok(DeleteOutcome::Deleted),
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Ok(DeleteOutcome::InUse),
        Err(e) => Err(e.into()),
    }
}
