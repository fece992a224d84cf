//! IdentityResolver: external subject → local user id, provisioning on first contact.
//!
//! Find-or-create is an optimistic insert. Two requests for the same unseen
//! subject may both miss the lookup and both insert; the store's unique
//! indexes let exactly one win, and the loser re-reads once by subject and
//! returns the winner's id. No application-level lock is taken.
use std::sync::Arc;

use crate::api::v1::extractors::{AuthCtx, RequestAuth};
use crate::error::AppError;
use crate::repos::{error::RepoError, user_repo::NewUser};
use crate::services::identity::store::IdentityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Authentication is disabled; no identity can be derived from the request.
    Unresolved,
    Resolved(i64),
}

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    placeholder_email_domain: String,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("placeholder_email_domain", &self.placeholder_email_domain)
            .finish()
    }
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>, placeholder_email_domain: impl Into<String>) -> Self {
        Self {
            store,
            placeholder_email_domain: placeholder_email_domain.into(),
        }
    }

    pub async fn resolve(&self, auth: &RequestAuth) -> Result<Resolution, AppError> {
        match auth {
            RequestAuth::Disabled => Ok(Resolution::Unresolved),
            RequestAuth::Authenticated(ctx) => self.resolve_context(ctx).await.map(Resolution::Resolved),
        }
    }

    /// Resolve, falling back to an explicitly supplied id only when auth is disabled.
    ///
    /// With auth enabled the fallback is ignored. With auth disabled and no
    /// fallback the request is rejected and nothing is provisioned. A fallback
    /// id must name an existing user.
    pub async fn resolve_or(
        &self,
        auth: &RequestAuth,
        fallback: Option<i64>,
    ) -> Result<i64, AppError> {
        match self.resolve(auth).await? {
            Resolution::Resolved(id) => Ok(id),
            Resolution::Unresolved => {
                let id = fallback.ok_or(AppError::Unauthorized("authentication required"))?;
                match self.store.find_by_id(id).await.map_err(internal)? {
                    Some(user) => Ok(user.id),
                    None => Err(AppError::bad_request("user_id does not name an existing user")),
                }
            }
        }
    }

    async fn resolve_context(&self, ctx: &AuthCtx) -> Result<i64, AppError> {
        if let Some(user) = self.store.find_by_subject(ctx.subject()).await.map_err(internal)? {
            return Ok(user.id);
        }

        let email = match ctx.email() {
            Some(email) => email.to_string(),
            None => self.placeholder_email(ctx.subject()),
        };
        let name = ctx.display_name().unwrap_or(ctx.subject());

        let new_user = NewUser {
            external_id: Some(ctx.subject()),
            email: &email,
            name,
            password_hash: "",
        };

        match self.store.insert(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, subject = ctx.subject(), "provisioned local user");
                Ok(user.id)
            }
            Err(RepoError::Conflict) => self.recover_conflict(ctx).await,
            Err(err) => Err(internal(err)),
        }
    }

    // Single re-read. If the subject is still unknown the conflict was on email,
    // i.e. another account already owns that address.
    async fn recover_conflict(&self, ctx: &AuthCtx) -> Result<i64, AppError> {
        match self.store.find_by_subject(ctx.subject()).await.map_err(internal)? {
            Some(user) => {
                tracing::debug!(user_id = user.id, subject = ctx.subject(), "lost provisioning race, using existing user");
                Ok(user.id)
            }
            None => {
                tracing::warn!(subject = ctx.subject(), "email already belongs to another local user");
                Err(AppError::Conflict("email is already associated with another account"))
            }
        }
    }

    fn placeholder_email(&self, subject: &str) -> String {
        format!("{}@{}", subject, self.placeholder_email_domain)
    }
}

fn internal(err: RepoError) -> AppError {
    tracing::error!(error = ?err, "identity store operation failed");
    AppError::Internal
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::services::identity::memory::MemoryIdentityStore;

    fn authenticated(subject: &str, email: Option<&str>, name: Option<&str>) -> RequestAuth {
        RequestAuth::Authenticated(AuthCtx::new(
            subject,
            email.map(str::to_string),
            name.map(str::to_string),
            [],
        ))
    }

    fn resolver(store: Arc<MemoryIdentityStore>) -> IdentityResolver {
        IdentityResolver::new(store, "idp.local")
    }

    #[tokio::test]
    async fn disabled_auth_is_unresolved() {
        let store = Arc::new(MemoryIdentityStore::new());
        let resolver = resolver(store.clone());

        assert_eq!(
            resolver.resolve(&RequestAuth::Disabled).await.unwrap(),
            Resolution::Unresolved
        );
        assert_eq!(store.insert_attempts(), 0);
    }

    #[tokio::test]
    async fn disabled_auth_without_fallback_is_rejected_without_provisioning() {
        let store = Arc::new(MemoryIdentityStore::new());
        let resolver = resolver(store.clone());

        let err = resolver.resolve_or(&RequestAuth::Disabled, None).await.unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(store.insert_attempts(), 0);
        assert!(store.rows().await.is_empty());
    }

    #[tokio::test]
    async fn fallback_is_used_only_when_auth_is_disabled() {
        let store = Arc::new(MemoryIdentityStore::new());
        let resolver = resolver(store.clone());

        let manual = store.seed(None, "m@x.com", "Manual").await;

        assert_eq!(
            resolver.resolve_or(&RequestAuth::Disabled, Some(manual.id)).await.unwrap(),
            manual.id
        );

        let auth = authenticated("abc123", Some("a@x.com"), None);
        let id = resolver.resolve_or(&auth, Some(manual.id)).await.unwrap();
        assert_ne!(id, manual.id);
        assert_eq!(store.rows().await.len(), 2);
    }

    #[tokio::test]
    async fn unknown_fallback_id_is_rejected() {
        let store = Arc::new(MemoryIdentityStore::new());
        let resolver = resolver(store.clone());

        let err = resolver
            .resolve_or(&RequestAuth::Disabled, Some(42))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn first_contact_provisions_and_second_call_reuses() {
        let store = Arc::new(MemoryIdentityStore::new());
        let resolver = resolver(store.clone());

        let first = resolver
            .resolve(&authenticated("abc123", Some("a@x.com"), Some("Alice")))
            .await
            .unwrap();
        let second = resolver
            .resolve(&authenticated("abc123", Some("changed@x.com"), Some("Alice")))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.insert_attempts(), 1);

        let rows = store.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].external_id.as_deref(), Some("abc123"));
        // Email is taken from the first contact and never overwritten.
        assert_eq!(rows[0].email, "a@x.com");
        assert_eq!(rows[0].name, "Alice");
    }

    #[tokio::test]
    async fn missing_claims_get_deterministic_placeholders() {
        let store = Arc::new(MemoryIdentityStore::new());
        let resolver = resolver(store.clone());

        resolver.resolve(&authenticated("sub-9", None, None)).await.unwrap();

        let rows = store.rows().await;
        assert_eq!(rows[0].email, "sub-9@idp.local");
        assert_eq!(rows[0].name, "sub-9");
    }

    #[tokio::test]
    async fn existing_subject_resolves_without_insert() {
        let store = Arc::new(MemoryIdentityStore::new());
        let seeded = store.seed(Some("abc123"), "a@x.com", "Alice").await;
        let resolver = resolver(store.clone());

        let resolved = resolver
            .resolve(&authenticated("abc123", Some("a@x.com"), None))
            .await
            .unwrap();

        assert_eq!(resolved, Resolution::Resolved(seeded.id));
        assert_eq!(store.insert_attempts(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_contact_creates_exactly_one_user() {
        const N: usize = 8;
        let store = Arc::new(MemoryIdentityStore::with_lookup_barrier(N));
        let resolver = resolver(store.clone());

        let mut handles = Vec::with_capacity(N);
        for _ in 0..N {
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver
                    .resolve(&authenticated("new-subject", Some("n@x.com"), None))
                    .await
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            let resolution = handle.await.unwrap().expect("no error surfaced");
            ids.insert(resolution);
        }

        assert_eq!(ids.len(), 1);
        // Every caller missed the lookup and tried to insert; only one row exists.
        assert_eq!(store.insert_attempts(), N);
        assert_eq!(store.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn email_owned_by_another_account_is_a_conflict() {
        let store = Arc::new(MemoryIdentityStore::new());
        store.seed(None, "a@x.com", "Manual").await;
        let resolver = resolver(store.clone());

        let err = resolver
            .resolve(&authenticated("abc123", Some("a@x.com"), None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn store_failures_surface_as_internal() {
        let store = Arc::new(MemoryIdentityStore::failing_inserts());
        let resolver = resolver(store.clone());

        let err = resolver
            .resolve(&authenticated("abc123", Some("a@x.com"), None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal));
        assert_eq!(store.insert_attempts(), 1);
    }
}
