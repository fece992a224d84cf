//! RoleGuard: pure role check, no store access.
use crate::api::v1::extractors::RequestAuth;
use crate::error::AppError;
use crate::services::auth::roles::Role;

/// What an operation does when authentication is disabled.
///
/// Every protected operation picks one explicitly at its call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledPolicy {
    /// Allow without a role check (local/dev reads).
    Open,
    /// Always deny; the operation is unavailable without an identity provider.
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    /// Deny → 403. The response never lists the caller's roles.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny => Err(AppError::Forbidden),
        }
    }
}

pub fn require_role(auth: &RequestAuth, role: Role, when_disabled: DisabledPolicy) -> Access {
    match auth {
        RequestAuth::Disabled => match when_disabled {
            DisabledPolicy::Open => Access::Allow,
            DisabledPolicy::Locked => Access::Deny,
        },
        RequestAuth::Authenticated(ctx) if ctx.has_role(role) => Access::Allow,
        RequestAuth::Authenticated(ctx) => {
            tracing::info!(subject = ctx.subject(), required = %role, "role check denied");
            Access::Deny
        }
    }
}
