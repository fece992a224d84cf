/*
 * Responsibility
 * - Config読み込み → 依存生成 (PgPool / AuthMode / IdentityResolver) → Router 組み立て
 * - Middleware の適用順 (内→外): auth gate → security headers → CORS → http (trace/timeout)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api::{self, v1::handlers::health::health},
    config::Config,
    middleware,
    services::{
        auth::build_auth_mode,
        identity::{IdentityResolver, PgIdentityStore},
    },
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG=info,workout_gateway=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: 即座に落として気付けるようにする
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.db_acquire_timeout())
        .connect(&config.database_url)
        .await?;

    let auth = build_auth_mode(config)?;
    tracing::info!(auth_enabled = auth.is_enabled(), "auth mode resolved");

    let identities = IdentityResolver::new(
        Arc::new(PgIdentityStore::new(db.clone())),
        config.placeholder_email_domain.clone(),
    );

    Ok(AppState::new(db, auth, identities))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let auth = state.auth.clone();

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes())
        .with_state(state);

    let router = middleware::auth::access::apply(router, auth);
    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}
