/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - introspection の呼び出しは middleware/services 側の責務
 * - ここは「型（契約）」として固定化する
 */
use std::collections::BTreeSet;

use crate::services::auth::{introspection::IntrospectedClaims, roles::Role};

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `subject` は IdP 上の識別子 (opaque, IdP ごとに安定)
/// - `email` / `display_name` は IdP が返した場合のみ
/// - 作成後は不変。リクエスト終了とともに破棄される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    subject: String,
    email: Option<String>,
    display_name: Option<String>,
    roles: BTreeSet<Role>,
}

impl AuthCtx {
    pub fn new(
        subject: impl Into<String>,
        email: Option<String>,
        display_name: Option<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            subject: subject.into(),
            email,
            display_name,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn from_claims(claims: IntrospectedClaims) -> Self {
        let roles = claims
            .roles
            .into_iter()
            .filter_map(|raw| match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(err) => {
                    tracing::debug!(error = %err, "ignoring role not known to this api");
                    None
                }
            });

        Self::new(claims.subject, claims.email, claims.display_name, roles)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }
}

/// Authentication state of the current request as seen by handlers.
///
/// `Disabled` means no introspection backend is configured. It is not the same
/// as an anonymous caller and must be handled explicitly by every consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAuth {
    Disabled,
    Authenticated(AuthCtx),
}

impl RequestAuth {
    pub fn context(&self) -> Option<&AuthCtx> {
        match self {
            RequestAuth::Disabled => None,
            RequestAuth::Authenticated(ctx) => Some(ctx),
        }
    }
}
