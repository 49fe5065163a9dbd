//! The impersonation state machine.
//!
//! A client session is in one of two states: **normal** or **impersonating**.
//! [`ImpersonateManager::take`] is the only transition into impersonating and
//! [`ImpersonateManager::leave`] the only transition out. The record of who
//! the real actor is lives in the host's session store; the manager itself
//! holds no mutable state and is safe to share behind an `Arc`.
//!
//! # Example
//!
//! ```rust,ignore
//! use masquerade::{ImpersonateManager, ImpersonateConfig, InMemorySessionStore};
//!
//! let manager = ImpersonateManager::new(provider, InMemorySessionStore::new(), ImpersonateConfig::default());
//!
//! // Admin on session "sess-1" starts acting as user-42
//! manager.take("sess-1", "user-42").await?;
//! assert!(manager.is_impersonating("sess-1").await?);
//!
//! // ...and returns to their own identity
//! manager.leave("sess-1").await?;
//! ```

use crate::config::ImpersonateConfig;
use crate::error::{MasqueradeError, Result};
use crate::identity::{CapabilityPolicy, Identity, IdentityProvider, ImpersonatePolicy};
use crate::session::SessionStore;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// The per-session impersonation record.
///
/// Written to the session store when impersonation starts, removed when it
/// ends. Its presence is what makes a session "impersonating".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpersonationRecord {
    /// The real actor who started the impersonation.
    pub impersonator_id: String,
    /// The identity being impersonated.
    pub target_id: String,
    /// Unix timestamp (seconds) when impersonation started.
    pub started_at: u64,
}

impl ImpersonationRecord {
    fn new(impersonator_id: &str, target_id: &str) -> Self {
        Self {
            impersonator_id: impersonator_id.to_string(),
            target_id: target_id.to_string(),
            started_at: unix_now(),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Manager for impersonation operations.
pub struct ImpersonateManager<P: IdentityProvider, S: SessionStore> {
    provider: P,
    store: S,
    config: ImpersonateConfig,
    policy: Box<dyn ImpersonatePolicy<P::Identity>>,
}

impl<P: IdentityProvider, S: SessionStore> ImpersonateManager<P, S> {
    /// Create a new manager with the default capability-flag policy.
    pub fn new(provider: P, store: S, config: ImpersonateConfig) -> Self {
        Self {
            provider,
            store,
            config,
            policy: Box::new(CapabilityPolicy),
        }
    }

    /// Replace the authorization policy.
    ///
    /// The policy fully replaces the default capability check; compose with
    /// [`CapabilityPolicy`] yourself if you want the flags and extra rules.
    pub fn with_policy(mut self, policy: impl ImpersonatePolicy<P::Identity> + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ImpersonateConfig {
        &self.config
    }

    /// Whether this session is currently impersonating.
    ///
    /// True iff the session key is present and holds a well-formed record.
    pub async fn is_impersonating(&self, session_id: &str) -> Result<bool> {
        Ok(self.read_record(session_id).await?.is_some())
    }

    /// The original actor's id, if this session is impersonating.
    pub async fn impersonator_id(&self, session_id: &str) -> Result<Option<String>> {
        Ok(self
            .read_record(session_id)
            .await?
            .map(|r| r.impersonator_id))
    }

    /// Start impersonating `target_id` on this session.
    ///
    /// The authenticated identity on the session becomes the impersonator;
    /// the session's effective identity is switched to the target. Exactly
    /// one impersonation per session: taking while already impersonating
    /// fails with [`MasqueradeError::AlreadyImpersonating`], no stacking.
    ///
    /// The session record and the identity swap apply atomically from the
    /// caller's perspective: if the swap fails the record is rolled back.
    pub async fn take(&self, session_id: &str, target_id: &str) -> Result<ImpersonationRecord> {
        if !self.config.enabled {
            return Err(MasqueradeError::forbidden("Impersonation is disabled"));
        }

        let actor = self
            .provider
            .current(session_id)
            .await?
            .ok_or_else(|| MasqueradeError::unauthenticated("No authenticated identity"))?;

        // While impersonating, the effective identity is the target; check
        // for nesting before the policy so the caller gets the right error.
        if self.read_record(session_id).await?.is_some() {
            tracing::warn!(
                target: "masquerade.rejected",
                actor_id = %actor.id(),
                target_id = %target_id,
                reason = "already_impersonating",
                "Impersonation rejected: session already impersonating"
            );
            return Err(MasqueradeError::AlreadyImpersonating);
        }

        if actor.id() == target_id {
            tracing::warn!(
                target: "masquerade.rejected",
                actor_id = %actor.id(),
                reason = "self_impersonation",
                "Impersonation rejected: cannot impersonate yourself"
            );
            return Err(MasqueradeError::invalid_target(
                "Cannot impersonate yourself",
            ));
        }

        let target = self
            .provider
            .find(target_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    target: "masquerade.rejected",
                    actor_id = %actor.id(),
                    target_id = %target_id,
                    reason = "target_not_found",
                    "Impersonation rejected: target not found"
                );
                MasqueradeError::forbidden("Target cannot be impersonated")
            })?;

        if !self.policy.allows(&actor, &target) {
            tracing::warn!(
                target: "masquerade.rejected",
                actor_id = %actor.id(),
                target_id = %target_id,
                reason = "policy_denied",
                "Impersonation rejected by policy"
            );
            return Err(MasqueradeError::forbidden(
                "Not allowed to impersonate this user",
            ));
        }

        let record = ImpersonationRecord::new(actor.id(), target.id());
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| MasqueradeError::store(format!("serialize record: {e}")))?;

        // The atomic claim closes the double-submit race the early nesting
        // check cannot: two concurrent takes both read an empty session.
        let claimed = self
            .store
            .set_if_absent(session_id, &self.config.session_key, bytes)
            .await?;
        if !claimed {
            // A concurrent request on the same session won the claim.
            tracing::warn!(
                target: "masquerade.rejected",
                actor_id = %actor.id(),
                target_id = %target_id,
                reason = "concurrent_take",
                "Impersonation rejected: session key claimed concurrently"
            );
            return Err(MasqueradeError::AlreadyImpersonating);
        }

        if let Err(err) = self.provider.set_effective(session_id, target.id()).await {
            // Roll back the record so the session is not left half-switched.
            if let Err(rollback_err) = self
                .store
                .delete(session_id, &self.config.session_key)
                .await
            {
                tracing::error!(
                    target: "masquerade.rollback_failed",
                    actor_id = %actor.id(),
                    target_id = %target_id,
                    error = %rollback_err,
                    "Failed to roll back impersonation record after identity swap failure"
                );
            }
            return Err(err);
        }

        tracing::info!(
            target: "masquerade.take",
            actor_id = %actor.id(),
            target_id = %target.id(),
            started_at = record.started_at,
            "Impersonation started"
        );

        Ok(record)
    }

    /// Stop impersonating and restore the original actor's identity.
    ///
    /// Fails with [`MasqueradeError::NotImpersonating`] when the session has
    /// no active impersonation.
    pub async fn leave(&self, session_id: &str) -> Result<ImpersonationRecord> {
        let record = self
            .read_record(session_id)
            .await?
            .ok_or(MasqueradeError::NotImpersonating)?;

        self.provider
            .set_effective(session_id, &record.impersonator_id)
            .await?;

        if let Err(err) = self
            .store
            .delete(session_id, &self.config.session_key)
            .await
        {
            // Swap back so the record and the effective identity stay in step.
            if let Err(rollback_err) = self
                .provider
                .set_effective(session_id, &record.target_id)
                .await
            {
                tracing::error!(
                    target: "masquerade.rollback_failed",
                    impersonator_id = %record.impersonator_id,
                    target_id = %record.target_id,
                    error = %rollback_err,
                    "Failed to restore impersonated identity after record delete failure"
                );
            }
            return Err(err);
        }

        tracing::info!(
            target: "masquerade.leave",
            impersonator_id = %record.impersonator_id,
            target_id = %record.target_id,
            "Impersonation ended"
        );

        Ok(record)
    }

    /// Request-scoped check for routes that require the caller's true
    /// identity: fails with [`MasqueradeError::Forbidden`] while the session
    /// is impersonating.
    pub async fn guard(&self, session_id: &str) -> Result<()> {
        if let Some(record) = self.read_record(session_id).await? {
            tracing::warn!(
                target: "masquerade.guard.blocked",
                impersonator_id = %record.impersonator_id,
                target_id = %record.target_id,
                "Blocked protected route during impersonation"
            );
            return Err(MasqueradeError::forbidden(
                "This action is not available while impersonating",
            ));
        }
        Ok(())
    }

    /// View-helper query: whether the session's current identity may start
    /// an impersonation right now.
    ///
    /// False while already impersonating, false for anonymous sessions;
    /// otherwise the identity's own capability flag decides.
    pub async fn can_impersonate(&self, session_id: &str) -> Result<bool> {
        if !self.config.enabled || self.is_impersonating(session_id).await? {
            return Ok(false);
        }
        Ok(self
            .provider
            .current(session_id)
            .await?
            .map(|identity| identity.can_impersonate())
            .unwrap_or(false))
    }

    async fn read_record(&self, session_id: &str) -> Result<Option<ImpersonationRecord>> {
        let Some(bytes) = self
            .store
            .get(session_id, &self.config.session_key)
            .await?
        else {
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                // A record we cannot parse counts as not impersonating.
                // Delete it so it does not keep occupying the session key
                // and lock the session out of future impersonation.
                tracing::warn!(
                    target: "masquerade.malformed_record",
                    session_key = %self.config.session_key,
                    error = %err,
                    "Discarding malformed impersonation record"
                );
                self.store
                    .delete(session_id, &self.config.session_key)
                    .await?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{InMemorySessionStore, SessionStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, RwLock};

    #[derive(Clone)]
    struct TestUser {
        id: String,
        can_impersonate: bool,
        can_be_impersonated: bool,
    }

    impl Identity for TestUser {
        fn id(&self) -> &str {
            &self.id
        }

        fn can_impersonate(&self) -> bool {
            self.can_impersonate
        }

        fn can_be_impersonated(&self) -> bool {
            self.can_be_impersonated
        }
    }

    #[derive(Clone, Default)]
    struct TestProvider {
        users: Arc<RwLock<HashMap<String, TestUser>>>,
        // session id -> effective user id
        effective: Arc<RwLock<HashMap<String, String>>>,
        fail_set_effective: Arc<AtomicBool>,
    }

    impl TestProvider {
        fn add_admin(&self, id: &str) {
            self.users.write().unwrap().insert(
                id.to_string(),
                TestUser {
                    id: id.to_string(),
                    can_impersonate: true,
                    can_be_impersonated: false,
                },
            );
        }

        fn add_user(&self, id: &str) {
            self.users.write().unwrap().insert(
                id.to_string(),
                TestUser {
                    id: id.to_string(),
                    can_impersonate: false,
                    can_be_impersonated: true,
                },
            );
        }

        fn login(&self, session_id: &str, user_id: &str) {
            self.effective
                .write()
                .unwrap()
                .insert(session_id.to_string(), user_id.to_string());
        }

        fn effective_id(&self, session_id: &str) -> Option<String> {
            self.effective.read().unwrap().get(session_id).cloned()
        }

        fn fail_next_swap(&self) {
            self.fail_set_effective.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl IdentityProvider for TestProvider {
        type Identity = TestUser;

        async fn current(&self, session_id: &str) -> Result<Option<TestUser>> {
            let Some(id) = self.effective.read().unwrap().get(session_id).cloned() else {
                return Ok(None);
            };
            Ok(self.users.read().unwrap().get(&id).cloned())
        }

        async fn find(&self, id: &str) -> Result<Option<TestUser>> {
            Ok(self.users.read().unwrap().get(id).cloned())
        }

        async fn set_effective(&self, session_id: &str, id: &str) -> Result<()> {
            if self.fail_set_effective.swap(false, Ordering::SeqCst) {
                return Err(MasqueradeError::store("identity backend unavailable"));
            }
            self.effective
                .write()
                .unwrap()
                .insert(session_id.to_string(), id.to_string());
            Ok(())
        }
    }

    fn setup() -> (TestProvider, InMemorySessionStore) {
        let provider = TestProvider::default();
        provider.add_admin("admin-1");
        provider.add_admin("admin-2");
        provider.add_user("user-1");
        provider.add_user("user-2");
        (provider, InMemorySessionStore::new())
    }

    fn manager(
        provider: &TestProvider,
        store: InMemorySessionStore,
    ) -> ImpersonateManager<TestProvider, InMemorySessionStore> {
        ImpersonateManager::new(provider.clone(), store, ImpersonateConfig::default())
    }

    #[tokio::test]
    async fn test_take_and_query() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        let manager = manager(&provider, store);

        assert!(!manager.is_impersonating("sess-1").await.unwrap());
        assert!(manager.impersonator_id("sess-1").await.unwrap().is_none());

        let record = manager.take("sess-1", "user-1").await.unwrap();
        assert_eq!(record.impersonator_id, "admin-1");
        assert_eq!(record.target_id, "user-1");

        assert!(manager.is_impersonating("sess-1").await.unwrap());
        assert_eq!(
            manager.impersonator_id("sess-1").await.unwrap(),
            Some("admin-1".to_string())
        );
        // Effective identity switched to the target
        assert_eq!(provider.effective_id("sess-1"), Some("user-1".to_string()));
    }

    #[tokio::test]
    async fn test_take_then_leave_round_trip() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        let manager = manager(&provider, store);

        manager.take("sess-1", "user-1").await.unwrap();
        let record = manager.leave("sess-1").await.unwrap();

        assert_eq!(record.impersonator_id, "admin-1");
        assert!(!manager.is_impersonating("sess-1").await.unwrap());
        // Back to the original actor
        assert_eq!(provider.effective_id("sess-1"), Some("admin-1".to_string()));
    }

    #[tokio::test]
    async fn test_no_nested_impersonation() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        let manager = manager(&provider, store);

        manager.take("sess-1", "user-1").await.unwrap();

        // While impersonating, even a session whose effective identity could
        // otherwise impersonate is rejected before any state changes.
        provider.login("sess-1", "admin-2");
        let err = manager.take("sess-1", "user-2").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::AlreadyImpersonating));

        // State unchanged from the first take
        assert_eq!(
            manager.impersonator_id("sess-1").await.unwrap(),
            Some("admin-1".to_string())
        );
    }

    /// Store wrapper that hides the session key from the next read,
    /// reproducing the window where a concurrent request claims the key
    /// after this request's nesting check.
    #[derive(Clone)]
    struct RacingStore {
        inner: InMemorySessionStore,
        hide_next: Arc<AtomicBool>,
    }

    impl RacingStore {
        fn new(inner: InMemorySessionStore) -> Self {
            Self {
                inner,
                hide_next: Arc::new(AtomicBool::new(false)),
            }
        }

        fn hide_next_get(&self) {
            self.hide_next.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SessionStore for RacingStore {
        async fn get(&self, session_id: &str, key: &str) -> Result<Option<Vec<u8>>> {
            if self.hide_next.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.get(session_id, key).await
        }

        async fn set(&self, session_id: &str, key: &str, value: Vec<u8>) -> Result<()> {
            self.inner.set(session_id, key, value).await
        }

        async fn delete(&self, session_id: &str, key: &str) -> Result<()> {
            self.inner.delete(session_id, key).await
        }

        async fn set_if_absent(&self, session_id: &str, key: &str, value: Vec<u8>) -> Result<bool> {
            self.inner.set_if_absent(session_id, key, value).await
        }
    }

    #[tokio::test]
    async fn test_take_losing_the_claim_race() {
        let (provider, inner) = setup();
        provider.login("sess-1", "admin-1");

        // A concurrent request already holds the key, but this request's
        // nesting check raced ahead of it and saw an empty session.
        let winner = ImpersonationRecord {
            impersonator_id: "admin-2".to_string(),
            target_id: "user-2".to_string(),
            started_at: 0,
        };
        inner
            .set(
                "sess-1",
                "impersonated_by",
                serde_json::to_vec(&winner).unwrap(),
            )
            .await
            .unwrap();

        let store = RacingStore::new(inner.clone());
        store.hide_next_get();
        let manager =
            ImpersonateManager::new(provider.clone(), store, ImpersonateConfig::default());

        let err = manager.take("sess-1", "user-1").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::AlreadyImpersonating));

        // The loser must not swap the identity or disturb the winner's record
        assert_eq!(provider.effective_id("sess-1"), Some("admin-1".to_string()));
        assert_eq!(
            manager.impersonator_id("sess-1").await.unwrap(),
            Some("admin-2".to_string())
        );
    }

    #[tokio::test]
    async fn test_leave_without_take() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        let manager = manager(&provider, store);

        let err = manager.leave("sess-1").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::NotImpersonating));
    }

    #[tokio::test]
    async fn test_self_impersonation_is_invalid_target() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        let manager = manager(&provider, store);

        let err = manager.take("sess-1", "admin-1").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_unauthenticated_session() {
        let (provider, store) = setup();
        let manager = manager(&provider, store);

        let err = manager.take("sess-anon", "user-1").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_actor_without_capability_leaves_store_untouched() {
        let (provider, store) = setup();
        provider.login("sess-1", "user-1");
        let manager = manager(&provider, store.clone());

        let err = manager.take("sess-1", "user-2").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::Forbidden(_)));

        // No session mutation on rejection
        assert!(store.is_empty().await);
        assert_eq!(provider.effective_id("sess-1"), Some("user-1".to_string()));
    }

    #[tokio::test]
    async fn test_target_must_be_impersonatable() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        let manager = manager(&provider, store);

        let err = manager.take("sess-1", "admin-2").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_missing_target_is_forbidden() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        let manager = manager(&provider, store);

        let err = manager.take("sess-1", "ghost").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_take_rolls_back_record_when_swap_fails() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        provider.fail_next_swap();
        let manager = manager(&provider, store.clone());

        let err = manager.take("sess-1", "user-1").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::Store(_)));

        // No half-switched session: record rolled back, identity unchanged
        assert!(store.is_empty().await);
        assert!(!manager.is_impersonating("sess-1").await.unwrap());
        assert_eq!(provider.effective_id("sess-1"), Some("admin-1".to_string()));
    }

    #[tokio::test]
    async fn test_leave_surfaces_swap_failure_and_keeps_record() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        let manager = manager(&provider, store);

        manager.take("sess-1", "user-1").await.unwrap();

        provider.fail_next_swap();
        let err = manager.leave("sess-1").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::Store(_)));

        // Still impersonating; a later leave succeeds
        assert!(manager.is_impersonating("sess-1").await.unwrap());
        manager.leave("sess-1").await.unwrap();
        assert_eq!(provider.effective_id("sess-1"), Some("admin-1".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_record_counts_as_not_impersonating() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");

        store
            .set("sess-1", "impersonated_by", b"not json".to_vec())
            .await
            .unwrap();

        let manager = manager(&provider, store);
        assert!(!manager.is_impersonating("sess-1").await.unwrap());
        assert!(manager.impersonator_id("sess-1").await.unwrap().is_none());

        let err = manager.leave("sess-1").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::NotImpersonating));
    }

    #[tokio::test]
    async fn test_malformed_record_is_discarded_and_session_recovers() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");

        store
            .set("sess-1", "impersonated_by", b"not json".to_vec())
            .await
            .unwrap();

        let manager = manager(&provider, store.clone());

        // Detecting the garbage frees the session key
        assert!(!manager.is_impersonating("sess-1").await.unwrap());
        assert!(store
            .get("sess-1", "impersonated_by")
            .await
            .unwrap()
            .is_none());

        // The session is back in the normal state: a valid take succeeds
        let record = manager.take("sess-1", "user-1").await.unwrap();
        assert_eq!(record.impersonator_id, "admin-1");
        assert!(manager.is_impersonating("sess-1").await.unwrap());

        manager.leave("sess-1").await.unwrap();
        assert_eq!(provider.effective_id("sess-1"), Some("admin-1".to_string()));
    }

    #[tokio::test]
    async fn test_take_recovers_without_a_prior_query() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");

        store
            .set("sess-1", "impersonated_by", b"{\"half\":".to_vec())
            .await
            .unwrap();

        // take's own nesting check discards the garbage before claiming
        let manager = manager(&provider, store);
        manager.take("sess-1", "user-1").await.unwrap();
        assert_eq!(
            manager.impersonator_id("sess-1").await.unwrap(),
            Some("admin-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_custom_policy_replaces_capability_check() {
        let (provider, store) = setup();
        provider.login("sess-1", "user-1");

        // Tenant-style policy that ignores the capability flags entirely
        let manager = manager(&provider, store)
            .with_policy(|actor: &TestUser, _target: &TestUser| actor.id.starts_with("user-"));

        manager.take("sess-1", "user-2").await.unwrap();
        assert!(manager.is_impersonating("sess-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_guard_blocks_only_while_impersonating() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");
        let manager = manager(&provider, store);

        manager.guard("sess-1").await.unwrap();

        manager.take("sess-1", "user-1").await.unwrap();
        let err = manager.guard("sess-1").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::Forbidden(_)));

        manager.leave("sess-1").await.unwrap();
        manager.guard("sess-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_can_impersonate_helper() {
        let (provider, store) = setup();
        let manager = manager(&provider, store);

        // Anonymous session
        assert!(!manager.can_impersonate("sess-1").await.unwrap());

        provider.login("sess-1", "user-1");
        assert!(!manager.can_impersonate("sess-1").await.unwrap());

        provider.login("sess-1", "admin-1");
        assert!(manager.can_impersonate("sess-1").await.unwrap());

        // While impersonating, the helper reports false
        manager.take("sess-1", "user-1").await.unwrap();
        assert!(!manager.can_impersonate("sess-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_disabled_config_refuses_take() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");

        let config = ImpersonateConfig::builder().enabled(false).build();
        let manager = ImpersonateManager::new(provider.clone(), store, config);

        let err = manager.take("sess-1", "user-1").await.unwrap_err();
        assert!(matches!(err, MasqueradeError::Forbidden(_)));
        assert!(!manager.can_impersonate("sess-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_custom_session_key() {
        let (provider, store) = setup();
        provider.login("sess-1", "admin-1");

        let config = ImpersonateConfig::builder().session_key("imp_by").build();
        let manager = ImpersonateManager::new(provider.clone(), store.clone(), config);

        manager.take("sess-1", "user-1").await.unwrap();
        assert!(store.get("sess-1", "imp_by").await.unwrap().is_some());
        assert!(store
            .get("sess-1", "impersonated_by")
            .await
            .unwrap()
            .is_none());
    }
}
