use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{Cookie, CookieJar, Key, SameSite};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::AppError;

/// Per-client session. Anonymous until a user id is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    user_id: Option<i64>,
}

impl Session {
    fn fresh() -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn bind(&mut self, user_id: i64) {
        self.user_id = Some(user_id);
    }

    pub fn clear(&mut self) {
        self.user_id = None;
    }
}

/// What travels inside the encrypted cookie.
#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    sid: Uuid,
    uid: Option<i64>,
    exp: i64, // unix seconds
}

/// Issues and verifies session cookies. Values are sealed with AES-256-GCM,
/// so a cookie that was altered in any way fails to open.
pub struct SessionAuthority {
    key: Key,
    cookie_name: String,
    path: String,
    max_age: Duration,
}

impl SessionAuthority {
    pub fn new(cfg: &SessionConfig, base_path: &str) -> anyhow::Result<Self> {
        let key = Key::try_from(cfg.secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("SESSION_SECRET must be at least 64 bytes: {e}"))?;
        Ok(Self::with_key(key, cfg, base_path))
    }

    pub(crate) fn with_key(key: Key, cfg: &SessionConfig, base_path: &str) -> Self {
        let path = if base_path.is_empty() {
            "/".to_string()
        } else {
            base_path.to_string()
        };
        Self {
            key,
            cookie_name: cfg.cookie_name.clone(),
            path,
            max_age: Duration::seconds(cfg.max_age_secs),
        }
    }

    /// Never fails: anything that is missing, forged, stale or unreadable
    /// becomes a fresh anonymous session.
    pub fn resolve(&self, headers: &HeaderMap) -> Session {
        let mut jar = CookieJar::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            for cookie in Cookie::split_parse(raw).flatten() {
                jar.add_original(cookie.into_owned());
            }
        }

        if jar.get(&self.cookie_name).is_none() {
            debug!("no session cookie; starting anonymous session");
            return Session::fresh();
        }

        let Some(opened) = jar.private(&self.key).get(&self.cookie_name) else {
            warn!("session cookie failed authentication; replacing it");
            return Session::fresh();
        };

        let payload: Payload = match serde_json::from_str(opened.value()) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "session payload undecodable; replacing it");
                return Session::fresh();
            }
        };

        if payload.exp < OffsetDateTime::now_utc().unix_timestamp() {
            debug!(session_id = %payload.sid, "session expired");
            return Session::fresh();
        }

        Session {
            id: payload.sid,
            user_id: payload.uid,
        }
    }

    /// `Set-Cookie` value carrying the session state with a refreshed expiry.
    pub fn persist(&self, session: &Session) -> Result<HeaderValue, AppError> {
        let payload = Payload {
            sid: session.id,
            uid: session.user_id,
            exp: (OffsetDateTime::now_utc() + self.max_age).unix_timestamp(),
        };
        let sealed = self.seal(&payload)?;
        debug!(session_id = %session.id, authenticated = session.is_authenticated(), "session persisted");
        HeaderValue::from_str(&sealed.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("session cookie header: {e}")))
    }

    fn seal(&self, payload: &Payload) -> Result<Cookie<'static>, AppError> {
        let value = serde_json::to_string(payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("encode session: {e}")))?;

        let mut jar = CookieJar::new();
        jar.private_mut(&self.key).add(
            Cookie::build((self.cookie_name.clone(), value))
                .path(self.path.clone())
                .secure(true)
                .http_only(true)
                .same_site(SameSite::Strict)
                .max_age(self.max_age),
        );
        jar.get(&self.cookie_name)
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("sealed session cookie missing")))
    }
}

/// Turns a `Set-Cookie` value into the `Cookie` request header a browser
/// would send back.
#[cfg(test)]
pub(crate) fn cookie_header_from(set_cookie: &HeaderValue) -> HeaderMap {
    let parsed = Cookie::parse(set_cookie.to_str().unwrap().to_string()).unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&format!("{}={}", parsed.name(), parsed.value())).unwrap(),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> SessionAuthority {
        let cfg = crate::state::test_config();
        SessionAuthority::with_key(Key::generate(), &cfg.session, &cfg.base_path)
    }

    fn tamper(set_cookie: &HeaderValue) -> HeaderMap {
        let parsed = Cookie::parse(set_cookie.to_str().unwrap().to_string()).unwrap();
        let mut value: Vec<char> = parsed.value().chars().collect();
        let mid = value.len() / 2;
        value[mid] = if value[mid] == 'A' { 'B' } else { 'A' };
        let value: String = value.into_iter().collect();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", parsed.name(), value)).unwrap(),
        );
        headers
    }

    #[test]
    fn missing_cookie_yields_anonymous() {
        let auth = authority();
        let session = auth.resolve(&HeaderMap::new());
        assert!(!session.is_authenticated());
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn bound_session_survives_roundtrip() {
        let auth = authority();
        let mut session = auth.resolve(&HeaderMap::new());
        session.bind(42);
        let set_cookie = auth.persist(&session).expect("persist");

        let resolved = auth.resolve(&cookie_header_from(&set_cookie));
        assert!(resolved.is_authenticated());
        assert_eq!(resolved.user_id(), Some(42));
        assert_eq!(resolved.id(), session.id());
    }

    #[test]
    fn cleared_session_resolves_anonymous() {
        let auth = authority();
        let mut session = auth.resolve(&HeaderMap::new());
        session.bind(7);
        session.clear();
        let set_cookie = auth.persist(&session).unwrap();
        let resolved = auth.resolve(&cookie_header_from(&set_cookie));
        assert!(!resolved.is_authenticated());
        assert_eq!(resolved.id(), session.id());
    }

    #[test]
    fn tampered_cookie_is_replaced() {
        let auth = authority();
        let mut session = auth.resolve(&HeaderMap::new());
        session.bind(42);
        let set_cookie = auth.persist(&session).unwrap();

        let resolved = auth.resolve(&tamper(&set_cookie));
        assert!(!resolved.is_authenticated());
        assert_ne!(resolved.id(), session.id());
    }

    #[test]
    fn cookie_from_other_key_is_rejected() {
        let issuer = authority();
        let other = authority();
        let mut session = issuer.resolve(&HeaderMap::new());
        session.bind(42);
        let set_cookie = issuer.persist(&session).unwrap();
        assert!(!other.resolve(&cookie_header_from(&set_cookie)).is_authenticated());
    }

    #[test]
    fn plaintext_cookie_is_not_trusted() {
        let auth = authority();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static(r#"gymlog_session={"sid":"00000000-0000-0000-0000-000000000000","uid":1,"exp":99999999999}"#),
        );
        assert!(!auth.resolve(&headers).is_authenticated());
    }

    #[test]
    fn expired_payload_is_replaced() {
        let auth = authority();
        let stale = Payload {
            sid: Uuid::new_v4(),
            uid: Some(42),
            exp: OffsetDateTime::now_utc().unix_timestamp() - 10,
        };
        let sealed = auth.seal(&stale).unwrap();
        let header = HeaderValue::from_str(&sealed.to_string()).unwrap();
        let resolved = auth.resolve(&cookie_header_from(&header));
        assert!(!resolved.is_authenticated());
        assert_ne!(resolved.id(), stale.sid);
    }

    #[test]
    fn cookie_attributes() {
        let auth = authority();
        let set_cookie = auth.persist(&Session::fresh()).unwrap();
        let text = set_cookie.to_str().unwrap();
        assert!(text.starts_with("gymlog_session="));
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("Secure"));
        assert!(text.contains("SameSite=Strict"));
        assert!(text.contains("Path=/gymlog"));
        assert!(text.contains("Max-Age=3600"));
        assert!(!text.contains("\"uid\""));
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut cfg = crate::state::test_config().session;
        cfg.secret = "too-short".into();
        assert!(SessionAuthority::new(&cfg, "/gymlog").is_err());
    }
}
