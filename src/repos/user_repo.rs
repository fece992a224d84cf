/*
 * Responsibility
 * - users テーブル向け SQLx 操作
 * - PgPool を受け取り lookup / insert を提供 (delete は持たない)
 * - unique 違反は RepoError::Conflict で返す
 */
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoError;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    #[sqlx(rename = "userId")]
    pub id: i64,
    // NULL => created administratively, never provisioned from a token
    #[sqlx(rename = "externalId")]
    pub external_id: Option<String>,
    pub email: String,
    pub name: String,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Insert payload. `password_hash` is empty for provider-provisioned users.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub external_id: Option<&'a str>,
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
}

pub async fn list(db: &PgPool, email: Option<&str>) -> Result<Vec<UserRow>, RepoError> {
    let rows = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT "userId", "externalId", email, name, "createdAt", "updatedAt"
        FROM users
        WHERE ($1::text IS NULL OR email = $1)
        ORDER BY "userId"
        "#,
    )
    .bind(email)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

pub async fn get(db: &PgPool, user_id: i64) -> Result<Option<UserRow>, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT "userId", "externalId", email, name, "createdAt", "updatedAt"
        FROM users
        WHERE "userId" = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn find_by_external_id(
    db: &PgPool,
    external_id: &str,
) -> Result<Option<UserRow>, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT "userId", "externalId", email, name, "createdAt", "updatedAt"
        FROM users
        WHERE "externalId" = $1
        "#,
    )
    .bind(external_id)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn create(db: &PgPool, user: NewUser<'_>) -> Result<UserRow, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users ("externalId", email, name, "passwordHash")
        VALUES ($1, $2, $3, $4)
        RETURNING "userId", "externalId", email, name, "createdAt", "updatedAt"
        "#,
    )
    .bind(user.external_id)
    .bind(user.email)
    .bind(user.name)
    .bind(user.password_hash)
    .fetch_one(db)
    .await
    .map_err(RepoError::from_sqlx)?;

    Ok(row)
}
