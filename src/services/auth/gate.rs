//! AuthGate: bearer extraction + introspection → AuthCtx.
//!
//! Core-only: no axum extractors here, so the rules can be exercised with a
//! plain `HeaderMap` and a stub introspector. The middleware in
//! `middleware::auth::access` decides *when* to call `authenticate`.

use std::{sync::Arc, time::Duration};

use axum::http::{HeaderMap, header};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::introspection::{IntrospectionError, TokenIntrospector};

const MISSING_CREDENTIAL: &str = "Missing or invalid Authorization header";
const INVALID_TOKEN: &str = "Invalid or expired token";

pub struct AuthGate {
    introspector: Arc<dyn TokenIntrospector>,
    protected_prefix: String,
    timeout: Duration,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("protected_prefix", &self.protected_prefix)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AuthGate {
    pub fn new(
        introspector: Arc<dyn TokenIntrospector>,
        protected_prefix: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            introspector,
            protected_prefix: protected_prefix.into(),
            timeout,
        }
    }

    /// Whether requests for `path` must carry a valid bearer token.
    pub fn protects(&self, path: &str) -> bool {
        path.starts_with(&self.protected_prefix)
    }

    /// Extract and introspect the bearer token.
    ///
    /// - missing/malformed header → 401, introspector is not called
    /// - provider says inactive/invalid → 401
    /// - provider unreachable/timeout/error status → 500
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthCtx, AppError> {
        let token = extract_bearer(headers).ok_or(AppError::Unauthorized(MISSING_CREDENTIAL))?;

        let result = match tokio::time::timeout(self.timeout, self.introspector.introspect(token))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(IntrospectionError::Timeout(self.timeout)),
        };

        match result {
            Ok(claims) => Ok(AuthCtx::from_claims(claims)),
            Err(err) if err.is_rejection() => {
                tracing::warn!(error = %err, reason = "rejected", "token introspection rejected the token");
                Err(AppError::Unauthorized(INVALID_TOKEN))
            }
            Err(err) => {
                tracing::error!(error = %err, reason = "unavailable", "token introspection failed");
                Err(AppError::Internal)
            }
        }
    }
}

/// `Authorization: Bearer <token>` only. Any other scheme or an empty token is None.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::services::auth::introspection::IntrospectedClaims;

    /// Introspector backed by a fixed token table.
    ///
    /// - `"slow"` never answers within any sane timeout
    /// - `"broken"` behaves like a provider returning 503
    #[derive(Default)]
    pub struct StubIntrospector {
        tokens: HashMap<String, IntrospectedClaims>,
        calls: AtomicUsize,
        completed: AtomicUsize,
    }

    impl StubIntrospector {
        pub fn with_token(mut self, token: &str, claims: IntrospectedClaims) -> Self {
            self.tokens.insert(token.to_string(), claims);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Calls that ran to the end (a dropped `"slow"` call never counts).
        pub fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenIntrospector for StubIntrospector {
        async fn introspect(&self, token: &str) -> Result<IntrospectedClaims, IntrospectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = match token {
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(IntrospectionError::Inactive)
                }
                "broken" => Err(IntrospectionError::Status(503)),
                _ => self
                    .tokens
                    .get(token)
                    .cloned()
                    .ok_or(IntrospectionError::Inactive),
            };
            self.completed.fetch_add(1, Ordering::SeqCst);
            result
        }
    }

    pub fn claims(subject: &str, email: Option<&str>, roles: &[&str]) -> IntrospectedClaims {
        IntrospectedClaims {
            subject: subject.to_string(),
            email: email.map(str::to_string),
            display_name: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }
}
