use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use tracing::{debug, info, instrument, warn};

use super::dto::{ChartQuery, ExerciseForm, ExercisesPage, HomePage, LogForm};
use super::repo;
use super::repo_types::DeleteOutcome;
use super::services::{parse_log, parse_or_zero, progress};
use crate::{
    app::found,
    auth::{
        dto::{Action, ActionQuery, PublicUser},
        extractors::CurrentUser,
    },
    error::AppError,
    state::AppState,
};

pub fn exercise_routes() -> Router<AppState> {
    Router::new()
        .route("/track", get(track).post(track))
        .route("/home", get(home))
        .route("/exercise", get(exercise).post(exercise))
}

#[instrument(skip(state, current, form), fields(user_id = current.user.id, session_id = %current.session.id()))]
pub async fn track(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ActionQuery>,
    form: Option<Form<LogForm>>,
) -> Result<Response, AppError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let outcome = track_page(&state, &current, query, form).await;
    current.refreshed(&state, outcome)
}

async fn track_page(
    state: &AppState,
    current: &CurrentUser,
    query: ActionQuery,
    form: LogForm,
) -> Result<Response, AppError> {
    if query.action == Some(Action::Save) {
        match parse_log(current.user.id, &form) {
            Some(log) => {
                let id = repo::insert_log(&state.db, &log).await?;
                info!(log_id = id, exercise_id = log.exercise_id, "exercise logged");
                return Ok(found(&state.config.path_to("track")));
            }
            None => debug!(?form, "incomplete exercise log ignored"),
        }
    }

    let exercises = repo::list_exercises(&state.db).await?;
    Ok(Json(ExercisesPage {
        user: PublicUser::from(&current.user),
        exercises,
    })
    .into_response())
}

#[instrument(skip(state, current), fields(user_id = current.user.id, session_id = %current.session.id()))]
pub async fn home(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ChartQuery>,
) -> Result<Response, AppError> {
    let outcome = home_page(&state, &current, query).await;
    current.refreshed(&state, outcome)
}

async fn home_page(
    state: &AppState,
    current: &CurrentUser,
    query: ChartQuery,
) -> Result<Response, AppError> {
    let requested_exercise = query.exercise_id.and_then(|v| v.trim().parse::<i64>().ok());
    let requested_weight = query.weight.and_then(|v| v.trim().parse::<f64>().ok());

    let p = progress(&state.db, current.user.id, requested_exercise, requested_weight).await?;
    Ok(Json(HomePage {
        user: PublicUser::from(&current.user),
        exercises: p.exercises,
        exercise_id: p.exercise_id,
        weights: p.weights,
        weight: p.weight,
        chart: p.chart,
    })
    .into_response())
}

#[instrument(skip(state, current, form), fields(user_id = current.user.id, session_id = %current.session.id()))]
pub async fn exercise(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ActionQuery>,
    form: Option<Form<ExerciseForm>>,
) -> Result<Response, AppError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let outcome = exercise_page(&state, &current, query, form).await;
    current.refreshed(&state, outcome)
}

async fn exercise_page(
    state: &AppState,
    current: &CurrentUser,
    query: ActionQuery,
    form: ExerciseForm,
) -> Result<Response, AppError> {
    let back = state.config.path_to("exercise");

    match query.action {
        Some(Action::Save) => {
            let name = form.name.trim();
            if name.is_empty() {
                return Err(AppError::validation("name", "exercise name required"));
            }
            let id = repo::insert_exercise(&state.db, name).await?;
            info!(exercise_id = id, name, "exercise created");
            return Ok(found(&back));
        }
        Some(Action::Delete) => {
            let id: i64 = parse_or_zero(&form.exercise_id);
            match repo::delete_exercise(&state.db, id).await? {
                DeleteOutcome::Deleted => info!(exercise_id = id, "exercise deleted"),
                DeleteOutcome::InUse => warn!(exercise_id = id, "exercise has logs; not deleted"),
                DeleteOutcome::Missing => debug!(exercise_id = id, "no such exercise"),
            }
            return Ok(found(&back));
        }
        _ => {}
    }

    let exercises = repo::list_exercises(&state.db).await?;
    Ok(Json(ExercisesPage {
        user: PublicUser::from(&current.user),
        exercises,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, HeaderMap, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::auth::repo::MemoryUserStore;
    use crate::auth::session::cookie_header_from;
    use crate::state::AppState;

    async fn signed_in() -> (AppState, i64, String) {
        let state = AppState::fake(Arc::new(MemoryUserStore::default()));
        let id = state
            .credentials
            .register("user@example.com", "longenough1", "Alice")
            .await
            .unwrap();
        let mut session = state.sessions.resolve(&HeaderMap::new());
        session.bind(id);
        let headers = cookie_header_from(&state.sessions.persist(&session).unwrap());
        let cookie = headers[header::COOKIE].to_str().unwrap().to_string();
        (state, id, cookie)
    }

    #[tokio::test]
    async fn protected_routes_redirect_anonymous() {
        let app = crate::app::build_app(AppState::fake(Arc::new(MemoryUserStore::default())));
        for uri in ["/gymlog/track", "/gymlog/home", "/gymlog/exercise?action=delete"] {
            let res = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::FOUND, "{uri}");
            assert_eq!(res.headers()[header::LOCATION], "/gymlog/login", "{uri}");
        }
    }

    #[tokio::test]
    async fn empty_exercise_name_is_rejected_and_session_refreshed() {
        let (state, id, cookie) = signed_in().await;
        let app = crate::app::build_app(state.clone());

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/gymlog/exercise?action=save")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header(header::COOKIE, cookie)
                    .body(Body::from("name=+++"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let set_cookie = res.headers()[header::SET_COOKIE].clone();
        let refreshed = state.sessions.resolve(&cookie_header_from(&set_cookie));
        assert_eq!(refreshed.user_id(), Some(id));

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "exercise name required");
        assert_eq!(body["field"], "name");
    }
}
