//! Request authentication. The middleware resolves the bearer token into a
//! principal and stashes it in request extensions; handlers that need a
//! caller pull it back out with the `Principal` extractor.

use anyhow::anyhow;
use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use service_core::error::AppError;

use crate::services::{AuthnError, Principal};
use crate::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))
}

/// Resolve the bearer token, if any, into a principal. Requests without a
/// valid token pass through unauthenticated; the extractor rejects them
/// only on routes that require a caller.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match state.authn_service.get_principal(token).await {
            Ok(principal) => {
                request.extensions_mut().insert(principal);
            }
            Err(AuthnError::Unauthenticated) => {}
            Err(AuthnError::Disabled) => {
                return AppError::Unauthenticated(anyhow!("principal is disabled")).into_response();
            }
            Err(AuthnError::Internal(err)) => {
                return AppError::InternalError(err).into_response();
            }
        }
    }
    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::Unauthenticated(anyhow!("not authenticated")))
    }
}
