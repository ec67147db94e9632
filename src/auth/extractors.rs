use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::repo_types::User;
use super::session::Session;
use crate::error::AppError;
use crate::state::AppState;

/// A request that resolved to a live user. Handlers that touch user-owned
/// data take this as an argument so the gate always runs first.
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

impl CurrentUser {
    /// Re-issues the session cookie on the handler's outcome so the expiry
    /// slides with activity. Storage failures pass through without a cookie.
    pub fn refreshed(
        &self,
        state: &AppState,
        outcome: Result<Response, AppError>,
    ) -> Result<Response, AppError> {
        let res = match outcome {
            Ok(res) => res,
            Err(e @ AppError::Internal(_)) => return Err(e),
            Err(e) => e.into_response(),
        };
        let set_cookie = state.sessions.persist(&self.session)?;
        Ok(crate::app::with_cookie(res, set_cookie))
    }
}

#[derive(Debug)]
pub enum GateRejection {
    /// Send the client to the login page, clearing a stale binding if present.
    Login {
        location: String,
        set_cookie: Option<HeaderValue>,
    },
    Failed(AppError),
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            GateRejection::Login {
                location,
                set_cookie,
            } => {
                let mut res = crate::app::found(&location);
                if let Some(v) = set_cookie {
                    res.headers_mut().append(header::SET_COOKIE, v);
                }
                res
            }
            GateRejection::Failed(e) => e.into_response(),
        }
    }
}

pub async fn require_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<CurrentUser, GateRejection> {
    let mut session = state.sessions.resolve(headers);
    let location = state.config.path_to("login");

    let Some(user_id) = session.user_id() else {
        debug!("anonymous request to protected route");
        return Err(GateRejection::Login {
            location,
            set_cookie: None,
        });
    };

    match state.credentials.load_user(user_id).await {
        Ok(user) => Ok(CurrentUser { user, session }),
        Err(AppError::NotFound(_)) => {
            warn!(user_id, session_id = %session.id(), "session bound to missing user; clearing");
            session.clear();
            let set_cookie = state
                .sessions
                .persist(&session)
                .map_err(GateRejection::Failed)?;
            Err(GateRejection::Login {
                location,
                set_cookie: Some(set_cookie),
            })
        }
        Err(e) => Err(GateRejection::Failed(e)),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = GateRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_user(state, &parts.headers).await
    }
}
