use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::AuthMode;

use super::{AuthCtx, RequestAuth};

/// Handler で RequestAuth を受け取るための extractor
///
/// - 認証無効: 常に `RequestAuth::Disabled`（extensions は見ない）
/// - 認証有効: middleware が insert 済みの AuthCtx を返す。見つからない場合は 401
///   （保護 prefix の外にある route でこの extractor を使った設定ミス）
impl<S> FromRequestParts<S> for RequestAuth
where
    AuthMode: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthMode::from_ref(state) {
            AuthMode::Disabled => Ok(RequestAuth::Disabled),
            AuthMode::Enabled(_) => parts
                .extensions
                .get::<AuthCtx>()
                .cloned()
                .map(RequestAuth::Authenticated)
                .ok_or(AppError::Unauthorized("authentication required")),
        }
    }
}
