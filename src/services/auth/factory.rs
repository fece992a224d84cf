/// Factory: build `AuthMode` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{
    AuthGate, AuthMode,
    introspection::{HttpIntrospector, IntrospectionError},
};

pub fn build_auth_mode(config: &Config) -> Result<AuthMode, IntrospectionError> {
    let Some(introspection) = &config.introspection else {
        tracing::warn!("no introspection backend configured, authentication is disabled");
        return Ok(AuthMode::Disabled);
    };

    let introspector = HttpIntrospector::new(introspection)?;
    tracing::info!(
        introspection_url = introspection.url.as_str(),
        protected_prefix = %config.protected_prefix,
        "authentication enabled"
    );

    Ok(AuthMode::Enabled(Arc::new(AuthGate::new(
        Arc::new(introspector),
        config.protected_prefix.clone(),
        introspection.timeout,
    ))))
}
