//! Token introspection (RFC 7662) against the identity provider.
//!
//! The gateway never verifies tokens locally: every bearer token is sent to the
//! provider's introspection endpoint, authenticated with the API's client
//! credentials. Callers must distinguish `is_rejection()` (token is bad, 401)
//! from everything else (provider unreachable/broken, 5xx).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::IntrospectionConfig;

/// Claims the provider returned for an active token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectedClaims {
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub roles: Vec<String>,
}

#[derive(Debug, Error)]
pub enum IntrospectionError {
    #[error("token is not active")]
    Inactive,
    #[error("active token without '{0}' claim")]
    MissingClaim(&'static str),
    #[error("introspection timed out after {0:?}")]
    Timeout(Duration),
    #[error("introspection endpoint returned status {0}")]
    Status(u16),
    #[error("introspection transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl IntrospectionError {
    /// True when the provider answered and said the token is not usable.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Inactive | Self::MissingClaim(_))
    }
}

#[async_trait]
pub trait TokenIntrospector: Send + Sync + 'static {
    async fn introspect(&self, token: &str) -> Result<IntrospectedClaims, IntrospectionError>;
}

/// Raw introspection response. Provider specific claims land in `extra`.
#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

// Roles claim is either an object keyed by role (Zitadel) or a plain array.
fn roles_from_claim(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn claims_from_response(
    resp: IntrospectionResponse,
    roles_claim: &str,
) -> Result<IntrospectedClaims, IntrospectionError> {
    if !resp.active {
        return Err(IntrospectionError::Inactive);
    }

    let subject = non_empty(resp.sub).ok_or(IntrospectionError::MissingClaim("sub"))?;
    let roles = roles_from_claim(resp.extra.get(roles_claim));

    Ok(IntrospectedClaims {
        subject,
        email: non_empty(resp.email),
        display_name: non_empty(resp.name).or_else(|| non_empty(resp.preferred_username)),
        roles,
    })
}

/// HTTP introspection client.
///
/// - Client secret is intentionally not printable via Debug.
#[derive(Clone)]
pub struct HttpIntrospector {
    client: reqwest::Client,
    url: Url,
    client_id: String,
    client_secret: String,
    roles_claim: String,
}

impl std::fmt::Debug for HttpIntrospector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIntrospector")
            .field("url", &self.url.as_str())
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl HttpIntrospector {
    pub fn new(config: &IntrospectionConfig) -> Result<Self, IntrospectionError> {
        // The whole call is bounded by the gate; this only caps connection setup.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            roles_claim: config.roles_claim.clone(),
        })
    }
}

#[async_trait]
impl TokenIntrospector for HttpIntrospector {
    async fn introspect(&self, token: &str) -> Result<IntrospectedClaims, IntrospectionError> {
        let res = self
            .client
            .post(self.url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", token), ("token_type_hint", "access_token")])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(IntrospectionError::Status(status.as_u16()));
        }

        let body: IntrospectionResponse = res.json().await?;
        claims_from_response(body, &self.roles_claim)
    }
}
