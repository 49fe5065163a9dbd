//! Identity and identity-provider traits.
//!
//! The impersonation core never owns users. It sees identities through the
//! [`Identity`] trait and reaches the host application's user storage and
//! authentication state through an [`IdentityProvider`]. Who may impersonate
//! whom is decided by an [`ImpersonatePolicy`], which defaults to the
//! capability flags on the identities themselves.

use crate::error::Result;
use async_trait::async_trait;

/// An identity as seen by the impersonation core.
///
/// Implement this on your user type. The capability flags default to `true`
/// on both sides; override them to restrict who may impersonate and who may
/// be impersonated (typically: admins may impersonate, admins may not be
/// impersonated).
///
/// # Example
///
/// ```rust,ignore
/// impl masquerade::Identity for User {
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     fn can_impersonate(&self) -> bool {
///         self.is_admin
///     }
///
///     fn can_be_impersonated(&self) -> bool {
///         !self.is_admin
///     }
/// }
/// ```
pub trait Identity: Send + Sync + Clone {
    /// Opaque identifier for this identity.
    fn id(&self) -> &str;

    /// Whether this identity may start impersonating others.
    fn can_impersonate(&self) -> bool {
        true
    }

    /// Whether this identity may be impersonated by others.
    fn can_be_impersonated(&self) -> bool {
        true
    }
}

/// Trait for identity providers
///
/// Implement this to connect the impersonation core to your authentication
/// backend. The provider owns two things the core delegates entirely:
///
/// - identity lookup (`current`, `find`)
/// - the *effective identity* of a client session (`set_effective`), i.e.
///   which user the rest of the system treats as "the current user"
///
/// `set_effective` is what actually switches the session over during
/// impersonation; the core only decides when it is allowed to happen.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The identity type this provider resolves.
    type Identity: Identity;

    /// The authenticated identity for a client session, if any.
    ///
    /// While impersonating, this is the *effective* (impersonated) identity,
    /// not the original actor.
    async fn current(&self, session_id: &str) -> Result<Option<Self::Identity>>;

    /// Look up an identity by id.
    async fn find(&self, id: &str) -> Result<Option<Self::Identity>>;

    /// Switch the session's effective identity.
    async fn set_effective(&self, session_id: &str, id: &str) -> Result<()>;
}

/// Authorization predicate deciding whether `actor` may impersonate `target`.
///
/// The default, [`CapabilityPolicy`], checks the capability flags on both
/// identities. Replace it to compose custom business rules (role hierarchy,
/// tenant isolation) on top of or instead of the flags.
pub trait ImpersonatePolicy<I: Identity>: Send + Sync {
    fn allows(&self, actor: &I, target: &I) -> bool;
}

/// Default policy: the actor's `can_impersonate` flag and the target's
/// `can_be_impersonated` flag must both be set.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityPolicy;

impl<I: Identity> ImpersonatePolicy<I> for CapabilityPolicy {
    fn allows(&self, actor: &I, target: &I) -> bool {
        actor.can_impersonate() && target.can_be_impersonated()
    }
}

impl<I: Identity, F> ImpersonatePolicy<I> for F
where
    F: Fn(&I, &I) -> bool + Send + Sync,
{
    fn allows(&self, actor: &I, target: &I) -> bool {
        self(actor, target)
    }
}
