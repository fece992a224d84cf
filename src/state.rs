/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - db: PgPool, auth: AuthMode, identities: IdentityResolver
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - AuthMode は FromRef で取り出せるようにする (RequestAuth extractor 用)
 */
use axum::extract::FromRef;

use crate::services::{auth::AuthMode, identity::IdentityResolver};

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub auth: AuthMode,
    pub identities: IdentityResolver,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, auth: AuthMode, identities: IdentityResolver) -> Self {
        Self {
            db,
            auth,
            identities,
        }
    }
}

impl FromRef<AppState> for AuthMode {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
