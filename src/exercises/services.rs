use sqlx::PgPool;
use time::format_description::well_known::Rfc3339;

use super::dto::{Chart, LogForm};
use super::repo;
use super::repo_types::{ChartPoint, Exercise, NewExerciseLog};
use crate::error::AppError;

pub(crate) fn parse_or_zero<T: std::str::FromStr + Default>(raw: &str) -> T {
    raw.trim().parse().unwrap_or_default()
}

/// A log is only kept when every number is positive.
pub fn parse_log(user_id: i64, form: &LogForm) -> Option<NewExerciseLog> {
    let log = NewExerciseLog {
        user_id,
        exercise_id: parse_or_zero(&form.exercise_id),
        weight: parse_or_zero(&form.weight),
        reps: parse_or_zero(&form.reps),
        sets: parse_or_zero(&form.sets),
    };
    let valid = log.exercise_id > 0
        && log.weight.is_finite()
        && log.weight > 0.0
        && log.reps > 0
        && log.sets > 0;
    valid.then_some(log)
}

/// Requested exercise, else the first completed one. Nothing when the user
/// has not logged anything yet.
pub fn select_exercise(completed: &[Exercise], requested: Option<i64>) -> Option<i64> {
    let first = completed.first()?;
    Some(requested.unwrap_or(first.id))
}

/// Requested weight, else the heaviest logged.
pub fn select_weight(weights: &[f64], requested: Option<f64>) -> Option<f64> {
    let heaviest = weights.first()?;
    Some(requested.unwrap_or(*heaviest))
}

pub fn to_chart(points: Vec<ChartPoint>) -> Result<Chart, AppError> {
    let mut chart = Chart::default();
    for p in points {
        let date = p
            .logged_at
            .format(&Rfc3339)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("format chart date: {e}")))?;
        chart.dates.push(date);
        chart.reps.push(p.reps);
    }
    Ok(chart)
}

pub struct Progress {
    pub exercises: Vec<Exercise>,
    pub exercise_id: Option<i64>,
    pub weights: Vec<f64>,
    pub weight: Option<f64>,
    pub chart: Chart,
}

/// Reps over time for one exercise at one weight.
pub async fn progress(
    db: &PgPool,
    user_id: i64,
    requested_exercise: Option<i64>,
    requested_weight: Option<f64>,
) -> Result<Progress, AppError> {
    let exercises = repo::completed_by_user(db, user_id).await?;
    let exercise_id = select_exercise(&exercises, requested_exercise);

    let weights = match exercise_id {
        Some(id) => repo::logged_weights(db, user_id, id).await?,
        None => Vec::new(),
    };
    let weight = select_weight(&weights, requested_weight);

    let chart = match (exercise_id, weight) {
        (Some(id), Some(w)) => to_chart(repo::chart(db, user_id, id, w).await?)?,
        _ => Chart::default(),
    };

    Ok(Progress {
        exercises,
        exercise_id,
        weights,
        weight,
        chart,
    })
}
