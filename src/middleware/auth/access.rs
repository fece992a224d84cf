//! bearer token 検証 (introspection) → AuthCtx を extensions に入れる
//!
//! - 認証無効 (AuthMode::Disabled): 何もせず next へ
//! - 保護 prefix 外: introspection を呼ばずに next へ
//! - 保護 prefix 内: AuthGate::authenticate の結果で拒否 or AuthCtx を付与
//!
//! AuthCtx はこのリクエストの extensions にのみ置く (global state は持たない)。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::AuthMode;

/// 全 route に認証 gate を掛ける。
///
/// path は nest 前のフルパスで判定するため、最上位の Router に適用すること。
/// ```ignore
/// let app = Router::new().nest("/api/v1", v1).with_state(state);
/// let app = middleware::auth::access::apply(app, auth_mode);
/// ```
pub fn apply(router: Router, mode: AuthMode) -> Router {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(mode, access_middleware))
}

async fn access_middleware(
    State(mode): State<AuthMode>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let gate = match &mode {
        AuthMode::Disabled => return Ok(next.run(req).await),
        AuthMode::Enabled(gate) => gate,
    };

    if !gate.protects(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let auth_ctx = gate.authenticate(req.headers()).await?;
    tracing::debug!(subject = auth_ctx.subject(), "request authenticated");

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(auth_ctx);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::to_bytes,
        http::{StatusCode, header},
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::api::v1::extractors::RequestAuth;
    use crate::services::auth::{
        AuthGate,
        gate::testing::{StubIntrospector, claims},
    };

    async fn whoami(auth: RequestAuth) -> String {
        match auth {
            RequestAuth::Disabled => "disabled".to_string(),
            RequestAuth::Authenticated(ctx) => ctx.subject().to_string(),
        }
    }

    async fn open() -> &'static str {
        "open"
    }

    fn app(mode: AuthMode) -> Router {
        let router = Router::new()
            .route("/api/v1/me", get(whoami))
            .route("/health", get(open))
            .with_state(mode.clone());
        apply(router, mode)
    }

    fn enabled(stub: Arc<StubIntrospector>) -> AuthMode {
        AuthMode::Enabled(Arc::new(AuthGate::new(stub, "/api/", Duration::from_millis(50))))
    }

    fn request(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn disabled_mode_passes_everything_through() {
        let res = app(AuthMode::Disabled)
            .oneshot(request("/api/v1/me", None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "disabled");
    }

    #[tokio::test]
    async fn unprotected_paths_never_call_the_introspector() {
        let stub = Arc::new(StubIntrospector::default());

        for authorization in [None, Some("Bearer whatever"), Some("Basic abc")] {
            let res = app(enabled(stub.clone()))
                .oneshot(request("/health", authorization))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn missing_header_is_401_without_introspection() {
        let stub = Arc::new(StubIntrospector::default());

        let res = app(enabled(stub.clone()))
            .oneshot(request("/api/v1/me", None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
        assert_eq!(body["title"], "Unauthorized");
        assert_eq!(body["status"], 401);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn rejected_token_is_401() {
        let stub = Arc::new(StubIntrospector::default());

        let res = app(enabled(stub.clone()))
            .oneshot(request("/api/v1/me", Some("Bearer revoked")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn introspection_timeout_is_500_not_401() {
        let stub = Arc::new(StubIntrospector::default());

        let res = app(enabled(stub))
            .oneshot(request("/api/v1/me", Some("Bearer slow")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn valid_token_attaches_context_with_introspected_subject() {
        let stub = Arc::new(
            StubIntrospector::default().with_token("good", claims("abc123", Some("a@x.com"), &[])),
        );

        let res = app(enabled(stub))
            .oneshot(request("/api/v1/me", Some("Bearer good")))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "abc123");
    }
}
