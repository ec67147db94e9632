use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    app::{found, with_cookie},
    auth::dto::{Action, ActionQuery, FormPage, LoginForm, RegisterForm},
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login).post(login))
        .route("/register", get(register).post(register))
}

/// Renders the failure as the page body; storage failures abort the request
/// before the session is written.
fn form_failure(e: AppError) -> Result<Response, AppError> {
    match e {
        AppError::Internal(_) => Err(e),
        other => Ok((other.status(), Json(FormPage { error: Some(other.public_message()) })).into_response()),
    }
}

#[instrument(skip(state, headers, form))]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
    form: Option<Form<LoginForm>>,
) -> Result<Response, AppError> {
    let mut session = state.sessions.resolve(&headers);
    let mut failure = None;

    match query.action {
        Some(Action::Login) => {
            let form = form.map(|Form(f)| f).unwrap_or_default();
            match state.credentials.login(&form.email, &form.password).await {
                Ok(user_id) => session.bind(user_id),
                Err(e @ AppError::Auth) => failure = Some(e),
                Err(e) => return Err(e),
            }
        }
        Some(Action::Logout) => {
            info!(session_id = %session.id(), user_id = ?session.user_id(), "logout");
            session.clear();
        }
        Some(other) => warn!(action = ?other, "unsupported action on login"),
        None => {}
    }

    let set_cookie = state.sessions.persist(&session)?;
    let res = if session.is_authenticated() {
        found(&state.config.path_to("track"))
    } else if let Some(e) = failure {
        form_failure(e)?
    } else {
        Json(FormPage { error: None }).into_response()
    };
    Ok(with_cookie(res, set_cookie))
}

#[instrument(skip(state, headers, form))]
pub async fn register(
    State(state): State<AppState>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
    form: Option<Form<RegisterForm>>,
) -> Result<Response, AppError> {
    let mut session = state.sessions.resolve(&headers);
    let mut failure = None;

    match query.action {
        Some(Action::Register) => {
            let form = form.map(|Form(f)| f).unwrap_or_default();
            match state
                .credentials
                .register(&form.email, &form.password, &form.name)
                .await
            {
                Ok(user_id) => session.bind(user_id),
                Err(AppError::Internal(e)) => return Err(AppError::Internal(e)),
                Err(e) => failure = Some(e),
            }
        }
        Some(other) => warn!(action = ?other, "unsupported action on register"),
        None => {}
    }

    let set_cookie = state.sessions.persist(&session)?;
    let res = if session.is_authenticated() {
        found(&state.config.path_to("track"))
    } else if let Some(e) = failure {
        form_failure(e)?
    } else {
        Json(FormPage { error: None }).into_response()
    };
    Ok(with_cookie(res, set_cookie))
}
