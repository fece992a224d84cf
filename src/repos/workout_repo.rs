/*
 * Responsibility
 * - workouts CRUD
 * - owner (userId) が Some のときは所有者でスコープする
 */
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::repos::error::RepoError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkoutRow {
    #[sqlx(rename = "workoutId")]
    pub workout_id: i64,

    #[sqlx(rename = "userId")]
    pub user_id: i64,

    pub name: String,
    pub description: Option<String>,

    #[sqlx(rename = "durationMinutes")]
    pub duration_minutes: i32,

    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

pub async fn list(db: &PgPool, owner: Option<i64>) -> Result<Vec<WorkoutRow>, RepoError> {
    let rows = sqlx::query_as::<_, WorkoutRow>(
        r#"
        SELECT
            "workoutId", "userId", name, description, "durationMinutes", "createdAt", "updatedAt"
        FROM workouts
        WHERE ($1::bigint IS NULL OR "userId" = $1)
        ORDER BY "workoutId" DESC
        "#,
    )
    .bind(owner)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

pub async fn create(
    db: &PgPool,
    user_id: i64,
    name: &str,
    description: Option<&str>,
    duration_minutes: i32,
) -> Result<WorkoutRow, RepoError> {
    let row = sqlx::query_as::<_, WorkoutRow>(
        r#"
        INSERT INTO workouts ("userId", name, description, "durationMinutes")
        VALUES ($1, $2, $3, $4)
        RETURNING
            "workoutId", "userId", name, description, "durationMinutes", "createdAt", "updatedAt"
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(description)
    .bind(duration_minutes)
    .fetch_one(db)
    .await?;

    Ok(row)
}

pub async fn get(
    db: &PgPool,
    workout_id: i64,
    owner: Option<i64>,
) -> Result<Option<WorkoutRow>, RepoError> {
    let row = sqlx::query_as::<_, WorkoutRow>(
        r#"
        SELECT
            "workoutId", "userId", name, description, "durationMinutes", "createdAt", "updatedAt"
        FROM workouts
        WHERE "workoutId" = $1
          AND ($2::bigint IS NULL OR "userId" = $2)
        "#,
    )
    .bind(workout_id)
    .bind(owner)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn update(
    db: &PgPool,
    workout_id: i64,
    owner: Option<i64>,
    name: Option<&str>,
    description: Option<&str>,
    duration_minutes: Option<i32>,
) -> Result<Option<WorkoutRow>, RepoError> {
    let row = sqlx::query_as::<_, WorkoutRow>(
        r#"
        UPDATE workouts
        SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            "durationMinutes" = COALESCE($5, "durationMinutes"),
            "updatedAt" = now()
        WHERE "workoutId" = $1
          AND ($2::bigint IS NULL OR "userId" = $2)
        RETURNING
            "workoutId", "userId", name, description, "durationMinutes", "createdAt", "updatedAt"
        "#,
    )
    .bind(workout_id)
    .bind(owner)
    .bind(name)
    .bind(description)
    .bind(duration_minutes)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn delete(db: &PgPool, workout_id: i64, owner: Option<i64>) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM workouts
        WHERE "workoutId" = $1
          AND ($2::bigint IS NULL OR "userId" = $2)
        "#,
    )
    .bind(workout_id)
    .bind(owner)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}
