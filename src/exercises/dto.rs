use serde::{Deserialize, Serialize};

use super::repo_types::Exercise;
use crate::auth::dto::PublicUser;

/// Raw form fields. Numbers arrive as text and unparseable values are
/// treated as zero.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogForm {
    pub exercise_id: String,
    pub weight: String,
    pub reps: String,
    pub sets: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExerciseForm {
    pub name: String,
    pub exercise_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChartQuery {
    pub exercise_id: Option<String>,
    pub weight: Option<String>,
}

/// Track and exercise pages share this shape.
#[derive(Debug, Serialize)]
pub struct ExercisesPage {
    pub user: PublicUser,
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct Chart {
    pub dates: Vec<String>, // RFC 3339
    pub reps: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub user: PublicUser,
    pub exercises: Vec<Exercise>,
    pub exercise_id: Option<i64>,
    pub weights: Vec<f64>,
    pub weight: Option<f64>,
    pub chart: Chart,
}
