//! HTTP surface for impersonation.
//!
//! Two routes, mirroring the classic take/leave pair:
//!
//! - `GET /impersonate/take/{id}` — start impersonating user `id`
//! - `GET /impersonate/leave` — return to the original identity
//!
//! Both redirect on success to the paths in
//! [`ImpersonateConfig`](crate::ImpersonateConfig); failures surface through
//! [`MasqueradeError`](crate::MasqueradeError)'s response mapping. The handlers read
//! the shared manager (see [`ImpersonateLayer`](crate::ImpersonateLayer)) and
//! the request's [`SessionId`] from extensions.

use crate::error::Result;
use crate::identity::IdentityProvider;
use crate::manager::ImpersonateManager;
use crate::session::{SessionId, SessionStore};
use axum::{
    Extension, Router,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use std::sync::Arc;

/// Build the impersonation router.
///
/// Merge into your application router *after* the session layer and the
/// [`ImpersonateLayer`](crate::ImpersonateLayer) have been applied.
pub fn routes<P, S>() -> Router
where
    P: IdentityProvider + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route("/impersonate/take/{id}", get(take::<P, S>))
        .route("/impersonate/leave", get(leave::<P, S>))
}

async fn take<P, S>(
    Extension(manager): Extension<Arc<ImpersonateManager<P, S>>>,
    Extension(session): Extension<SessionId>,
    Path(id): Path<String>,
) -> Result<Response>
where
    P: IdentityProvider + 'static,
    S: SessionStore + 'static,
{
    if !manager.config().enabled {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    manager.take(session.as_str(), &id).await?;
    Ok(Redirect::to(&manager.config().take_redirect_to).into_response())
}

async fn leave<P, S>(
    Extension(manager): Extension<Arc<ImpersonateManager<P, S>>>,
    Extension(session): Extension<SessionId>,
) -> Result<Response>
where
    P: IdentityProvider + 'static,
    S: SessionStore + 'static,
{
    if !manager.config().enabled {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    manager.leave(session.as_str()).await?;
    Ok(Redirect::to(&manager.config().leave_redirect_to).into_response())
}
