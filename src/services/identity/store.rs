//! Identity store interface used by the resolver.
use async_trait::async_trait;
use sqlx::PgPool;

use crate::repos::{
    error::RepoError,
    user_repo::{self, NewUser, UserRow},
};

/// Persistent local identities.
///
/// Implementations must enforce uniqueness of `external_id` (when present) and
/// `email`, and report a violation as `RepoError::Conflict`.
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserRow>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRow>, RepoError>;

    async fn insert(&self, user: NewUser<'_>) -> Result<UserRow, RepoError>;
}

/// Postgres-backed store (unique indexes on "externalId" and email).
#[derive(Clone, Debug)]
pub struct PgIdentityStore {
    db: PgPool,
}

impl PgIdentityStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserRow>, RepoError> {
        user_repo::find_by_external_id(&self.db, subject).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRow>, RepoError> {
        user_repo::get(&self.db, id).await
    }

    async fn insert(&self, user: NewUser<'_>) -> Result<UserRow, RepoError> {
        user_repo::create(&self.db, user).await
    }
}
