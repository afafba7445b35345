use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{authorize, PrincipalContext};
use crate::error::ApiError;
use crate::types::Operation;

/// Role authorization middleware. Attached per route with the route's
/// [`Operation`] as state; runs after [`super::api_key_auth_middleware`].
pub async fn require_roles(
    State(operation): State<Operation>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request.extensions().get::<PrincipalContext>();
    if let Err(e) = authorize(operation.required_roles(), principal) {
        tracing::debug!(
            "Denied {} to {}",
            operation,
            principal.map(|p| p.id.as_str()).unwrap_or("<anonymous>")
        );
        return Err(e.into());
    }
    Ok(next.run(request).await)
}
