/*
 * Responsibility
 * - /workouts 系 CRUD handler
 * - 所有者は IdentityResolver で token から解決する (初回は local user を作成)
 *   - 認証有効: 解決した user に scope する (query/body の user_id は無視)
 *   - 認証無効: 作成時のみ body の user_id を使う。参照系は scope なし
 * - 他人の workout は存在しないものとして 404 を返す
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    api::v1::{
        dto::workouts::{
            CreateWorkoutRequest, ListWorkoutsQuery, UpdateWorkoutRequest, WorkoutResponse,
        },
        extractors::RequestAuth,
    },
    error::AppError,
    repos::workout_repo,
    services::identity::Resolution,
    state::AppState,
};

async fn owner_scope(state: &AppState, auth: &RequestAuth) -> Result<Option<i64>, AppError> {
    Ok(match state.identities.resolve(auth).await? {
        Resolution::Resolved(user_id) => Some(user_id),
        Resolution::Unresolved => None,
    })
}

pub async fn list_workouts(
    State(state): State<AppState>,
    auth: RequestAuth,
    Query(query): Query<ListWorkoutsQuery>,
) -> Result<Json<Vec<WorkoutResponse>>, AppError> {
    let owner = owner_scope(&state, &auth).await?.or(query.user_id);

    let rows = workout_repo::list(&state.db, owner).await?;

    Ok(Json(rows.into_iter().map(WorkoutResponse::from).collect()))
}

pub async fn get_workout(
    State(state): State<AppState>,
    auth: RequestAuth,
    Path(workout_id): Path<i64>,
) -> Result<Json<WorkoutResponse>, AppError> {
    let owner = owner_scope(&state, &auth).await?;

    let row = workout_repo::get(&state.db, workout_id, owner)
        .await?
        .ok_or(AppError::not_found("workout"))?;

    Ok(Json(row.into()))
}

pub async fn create_workout(
    State(state): State<AppState>,
    auth: RequestAuth,
    Json(req): Json<CreateWorkoutRequest>,
) -> Result<(StatusCode, Json<WorkoutResponse>), AppError> {
    req.validate().map_err(AppError::bad_request)?;

    let user_id = state.identities.resolve_or(&auth, req.user_id).await?;

    let row = workout_repo::create(
        &state.db,
        user_id,
        req.name.trim(),
        req.description.as_deref(),
        req.duration_minutes,
    )
    .await?;

    tracing::debug!(workout_id = row.workout_id, user_id, "workout created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_workout(
    State(state): State<AppState>,
    auth: RequestAuth,
    Path(workout_id): Path<i64>,
    Json(req): Json<UpdateWorkoutRequest>,
) -> Result<Json<WorkoutResponse>, AppError> {
    req.validate().map_err(AppError::bad_request)?;

    let owner = owner_scope(&state, &auth).await?;

    let row = workout_repo::update(
        &state.db,
        workout_id,
        owner,
        req.name.as_deref().map(str::trim),
        req.description.as_deref(),
        req.duration_minutes,
    )
    .await?
    .ok_or(AppError::not_found("workout"))?;

    Ok(Json(row.into()))
}

pub async fn delete_workout(
    State(state): State<AppState>,
    auth: RequestAuth,
    Path(workout_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let owner = owner_scope(&state, &auth).await?;

    if workout_repo::delete(&state.db, workout_id, owner).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("workout"))
    }
}
