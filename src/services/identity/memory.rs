//! In-memory identity store for tests.
//!
//! Enforces the same uniqueness rules as the `users` table. An optional lookup
//! barrier holds the first `n` subject lookups until all of them have read,
//! so `n` concurrent callers are guaranteed to observe "not found".
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Barrier, RwLock};

use crate::repos::{
    error::RepoError,
    user_repo::{NewUser, UserRow},
};
use crate::services::identity::store::IdentityStore;

#[derive(Default)]
pub struct MemoryIdentityStore {
    rows: RwLock<Vec<UserRow>>,
    inserts: AtomicUsize,
    lookup_gate: Option<(Arc<Barrier>, usize)>,
    gated_lookups: AtomicUsize,
    fail_inserts: bool,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup_barrier(n: usize) -> Self {
        Self {
            lookup_gate: Some((Arc::new(Barrier::new(n)), n)),
            ..Self::default()
        }
    }

    pub fn failing_inserts() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    /// Number of insert attempts, including ones rejected as conflicts.
    pub fn insert_attempts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub async fn rows(&self) -> Vec<UserRow> {
        self.rows.read().await.clone()
    }

    pub async fn seed(&self, external_id: Option<&str>, email: &str, name: &str) -> UserRow {
        let mut rows = self.rows.write().await;
        let row = Self::row(rows.len() as i64 + 1, external_id, email, name);
        rows.push(row.clone());
        row
    }

    fn row(id: i64, external_id: Option<&str>, email: &str, name: &str) -> UserRow {
        let now = Utc::now();
        UserRow {
            id,
            external_id: external_id.map(str::to_string),
            email: email.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserRow>, RepoError> {
        let found = self
            .rows
            .read()
            .await
            .iter()
            .find(|r| r.external_id.as_deref() == Some(subject))
            .cloned();

        if let Some((barrier, n)) = &self.lookup_gate
            && self.gated_lookups.fetch_add(1, Ordering::SeqCst) < *n
        {
            barrier.wait().await;
        }

        Ok(found)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRow>, RepoError> {
        Ok(self.rows.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn insert(&self, user: NewUser<'_>) -> Result<UserRow, RepoError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(RepoError::Db(sqlx::Error::PoolTimedOut));
        }

        let mut rows = self.rows.write().await;
        let taken = rows.iter().any(|r| {
            r.email == user.email
                || (user.external_id.is_some() && r.external_id.as_deref() == user.external_id)
        });
        if taken {
            return Err(RepoError::Conflict);
        }

        let row = Self::row(rows.len() as i64 + 1, user.external_id, user.email, user.name);
        rows.push(row.clone());
        Ok(row)
    }
}
