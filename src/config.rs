/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, CORS 許可、Auth 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - AUTH_INTROSPECTION_URL が無ければ認証は無効 (local/test 用)
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_ROLES_CLAIM: &str = "urn:zitadel:iam:org:project:roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Settings for the token introspection backend.
///
/// Client secret is intentionally not printable via Debug.
#[derive(Clone)]
pub struct IntrospectionConfig {
    pub url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub roles_claim: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for IntrospectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntrospectionConfig")
            .field("url", &self.url.as_str())
            .field("client_id", &self.client_id)
            .field("roles_claim", &self.roles_claim)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,

    // None => authentication disabled
    pub introspection: Option<IntrospectionConfig>,
    pub protected_prefix: String,
    pub placeholder_email_domain: String,
}

impl Config {
    /// Pool acquire wait. Kept under the request deadline so a stalled
    /// database surfaces as a store error rather than a deadline expiry.
    pub fn db_acquire_timeout(&self) -> Duration {
        self.request_timeout / 2
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (env in production, a map in tests).
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let database_max_connections = get("DATABASE_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let app_env = get("APP_ENV")
            .map(|v| AppEnv::parse(&v))
            .unwrap_or(AppEnv::Development);

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let request_timeout = get("REQUEST_TIMEOUT_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let body_limit_bytes = get("BODY_LIMIT_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        let introspection = match get("AUTH_INTROSPECTION_URL").filter(|v| !v.trim().is_empty()) {
            Some(raw) => {
                let url =
                    Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid("AUTH_INTROSPECTION_URL"))?;
                let client_id = get("AUTH_CLIENT_ID")
                    .filter(|v| !v.is_empty())
                    .ok_or(ConfigError::Missing("AUTH_CLIENT_ID"))?;
                let client_secret = get("AUTH_CLIENT_SECRET")
                    .filter(|v| !v.is_empty())
                    .ok_or(ConfigError::Missing("AUTH_CLIENT_SECRET"))?;
                let roles_claim =
                    get("AUTH_ROLES_CLAIM").unwrap_or_else(|| DEFAULT_ROLES_CLAIM.to_string());
                let timeout_secs = match get("AUTH_INTROSPECTION_TIMEOUT_SECONDS") {
                    Some(v) => v
                        .parse::<u64>()
                        .ok()
                        .filter(|s| *s > 0)
                        .ok_or(ConfigError::Invalid("AUTH_INTROSPECTION_TIMEOUT_SECONDS"))?,
                    None => 5,
                };
                let timeout = Duration::from_secs(timeout_secs);
                // introspection must give up before the request deadline fires
                if timeout >= request_timeout {
                    return Err(ConfigError::Invalid("AUTH_INTROSPECTION_TIMEOUT_SECONDS"));
                }

                Some(IntrospectionConfig {
                    url,
                    client_id,
                    client_secret,
                    roles_claim,
                    timeout,
                })
            }
            None => None,
        };

        let protected_prefix = get("AUTH_PROTECTED_PREFIX").unwrap_or_else(|| "/api/".to_string());
        if !protected_prefix.starts_with('/') {
            return Err(ConfigError::Invalid("AUTH_PROTECTED_PREFIX"));
        }

        let placeholder_email_domain =
            get("AUTH_PLACEHOLDER_EMAIL_DOMAIN").unwrap_or_else(|| "idp.local".to_string());

        Ok(Self {
            addr,
            database_url,
            database_max_connections,
            app_env,
            cors_allowed_origins,
            request_timeout,
            body_limit_bytes,
            introspection,
            protected_prefix,
            placeholder_email_domain,
        })
    }
}
