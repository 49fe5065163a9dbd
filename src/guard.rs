use crate::error::MasqueradeError;
use crate::identity::IdentityProvider;
use crate::manager::ImpersonateManager;
use crate::session::{SessionId, SessionStore};
use axum::{extract::Request, middleware::Next, response::Response};
use std::marker::PhantomData;
use std::sync::Arc;

/// Middleware that rejects requests made while impersonating
///
/// Wrap routes that must only ever run as the caller's true identity:
/// credential changes, account deletion, and re-triggering impersonation
/// itself. Requires the shared manager in request extensions (see
/// [`ImpersonateLayer`]) and a [`SessionId`] inserted by your session
/// middleware.
///
/// # Example
///
/// ```rust,ignore
/// use axum::Router;
/// use masquerade::ProtectFromImpersonation;
///
/// let sensitive_routes = Router::new()
///     .route("/settings/password", post(change_password))
///     .layer(axum::middleware::from_fn(
///         ProtectFromImpersonation::<MyProvider, MyStore>::middleware,
///     ));
/// ```
pub struct ProtectFromImpersonation<P: IdentityProvider, S: SessionStore> {
    _marker: PhantomData<(P, S)>,
}

impl<P, S> ProtectFromImpersonation<P, S>
where
    P: IdentityProvider + 'static,
    S: SessionStore + 'static,
{
    /// Middleware function that blocks impersonated sessions
    pub async fn middleware(request: Request, next: Next) -> Result<Response, MasqueradeError> {
        let manager = request
            .extensions()
            .get::<Arc<ImpersonateManager<P, S>>>()
            .cloned()
            .ok_or_else(|| {
                MasqueradeError::store("Impersonate manager not found in request extensions")
            })?;

        let session = request
            .extensions()
            .get::<SessionId>()
            .cloned()
            .ok_or_else(|| MasqueradeError::unauthenticated("No session on request"))?;

        manager.guard(session.as_str()).await?;

        Ok(next.run(request).await)
    }
}

/// Middleware layer that adds the shared manager to request extensions
///
/// Apply once near the top of the router; the impersonation routes and
/// [`ProtectFromImpersonation`] read the manager back out.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .merge(masquerade::routes::<MyProvider, MyStore>())
///     .layer(axum::middleware::from_fn_with_state(
///         ImpersonateLayer::new(manager),
///         |state, req, next| async move { state.middleware(req, next).await },
///     ));
/// ```
pub struct ImpersonateLayer<P: IdentityProvider, S: SessionStore> {
    manager: Arc<ImpersonateManager<P, S>>,
}

impl<P, S> ImpersonateLayer<P, S>
where
    P: IdentityProvider + 'static,
    S: SessionStore + 'static,
{
    pub fn new(manager: Arc<ImpersonateManager<P, S>>) -> Self {
        Self { manager }
    }

    /// Middleware function that adds the manager to extensions
    pub async fn middleware(&self, mut request: Request, next: Next) -> Response {
        request.extensions_mut().insert(self.manager.clone());
        next.run(request).await
    }
}

impl<P: IdentityProvider, S: SessionStore> Clone for ImpersonateLayer<P, S> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
        }
    }
}
