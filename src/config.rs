use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub max_age_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub max_connections: u32,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Prefix every route is nested under; also the session cookie path.
    pub base_path: String,
    pub session: SessionConfig,
    pub db: DbConfig,
}

/// Unset falls back to `default`; set but unparseable is an error.
fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has invalid value {v:?}")),
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_var(key, std::env::var(key).ok(), default)
}

fn positive_max_age(secs: i64) -> anyhow::Result<i64> {
    if secs <= 0 {
        anyhow::bail!("SESSION_MAX_AGE_SECS must be positive, got {secs}");
    }
    Ok(secs)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET").context("SESSION_SECRET is not set")?,
            cookie_name: std::env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "gymlog_session".into()),
            max_age_secs: positive_max_age(env_or("SESSION_MAX_AGE_SECS", 3600)?)?,
        };
        let db = DbConfig {
            max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 180)?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 180)?,
        };
        let base_path = normalize_base_path(
            &std::env::var("BASE_PATH").unwrap_or_else(|_| "/gymlog".into()),
        );
        Ok(Self {
            database_url,
            base_path,
            session,
            db,
        })
    }

    /// Absolute path of a route below the base path, e.g. `login` -> `/gymlog/login`.
    pub fn path_to(&self, route: &str) -> String {
        format!("{}/{}", self.base_path, route.trim_start_matches('/'))
    }
}

/// Leading slash, no trailing slash. The root collapses to the empty string.
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_is_normalized() {
        assert_eq!(normalize_base_path("/gymlog/"), "/gymlog");
        assert_eq!(normalize_base_path("seb/gymlog"), "/seb/gymlog");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path(""), "");
    }

    #[test]
    fn unset_variable_uses_default() {
        assert_eq!(parse_var::<i64>("SESSION_MAX_AGE_SECS", None, 3600).unwrap(), 3600);
        assert_eq!(
            parse_var::<i64>("SESSION_MAX_AGE_SECS", Some(" 600 ".into()), 3600).unwrap(),
            600
        );
    }

    #[test]
    fn unparseable_variable_is_an_error() {
        let err = parse_var::<i64>("SESSION_MAX_AGE_SECS", Some("abc".into()), 3600).unwrap_err();
        assert!(err.to_string().contains("SESSION_MAX_AGE_SECS"));
        assert!(parse_var::<u32>("DB_MAX_CONNECTIONS", Some("-1".into()), 10).is_err());
    }

    #[test]
    fn max_age_must_be_positive() {
        assert_eq!(positive_max_age(3600).unwrap(), 3600);
        assert!(positive_max_age(0).is_err());
        assert!(positive_max_age(-5).is_err());
    }

    #[test]
    fn path_to_joins_under_base() {
        let cfg = crate::state::test_config();
        assert_eq!(cfg.path_to("login"), "/gymlog/login");
        assert_eq!(cfg.path_to("/track"), "/gymlog/track");
    }
}
