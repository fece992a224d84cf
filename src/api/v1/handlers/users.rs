/*
 * Responsibility
 * - /users 系 handler (管理者向け)
 * - RoleGuard で admin を要求する。認証無効時の扱いは操作ごとに明示する
 *   - 参照系: Open (開発用に素通し)
 *   - 作成: Locked (認証無効でも開けない)
 * - password は argon2 で hash してから保存する
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    api::v1::{
        dto::users::{CreateUserRequest, ListUsersQuery, UserResponse},
        extractors::RequestAuth,
    },
    error::AppError,
    repos::user_repo::{self, NewUser},
    services::{
        auth::{DisabledPolicy, Role, require_role},
        password::hash_password,
    },
    state::AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    auth: RequestAuth,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    require_role(&auth, Role::Admin, DisabledPolicy::Open).into_result()?;

    let rows = user_repo::list(&state.db, query.email.as_deref()).await?;

    Ok(Json(rows.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: RequestAuth,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    require_role(&auth, Role::Admin, DisabledPolicy::Open).into_result()?;

    let row = user_repo::get(&state.db, user_id)
        .await?
        .ok_or(AppError::not_found("user"))?;

    Ok(Json(row.into()))
}

pub async fn create_user(
    State(state): State<AppState>,
    auth: RequestAuth,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    require_role(&auth, Role::Admin, DisabledPolicy::Locked).into_result()?;
    req.validate().map_err(AppError::bad_request)?;

    // argon2 は CPU を食うので runtime の worker を塞がない
    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "password hashing task failed");
            AppError::Internal
        })?
        .map_err(|e| {
            tracing::error!(error = ?e, "password hashing failed");
            AppError::Internal
        })?;

    let row = user_repo::create(
        &state.db,
        NewUser {
            external_id: None,
            email: req.email.trim(),
            name: req.name.trim(),
            password_hash: &password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = row.id, "user created");
    Ok((StatusCode::CREATED, Json(row.into())))
}
