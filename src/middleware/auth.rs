use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use crate::auth::{self, AuthError, PrincipalContext, INVALID_API_KEY};
use crate::database::PrincipalRepository;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the key. Header lookup ignores case, so `apikey` matches too.
pub const API_KEY_HEADER: &str = "apiKey";
/// Query parameter fallback, matched exactly.
pub const API_KEY_QUERY_PARAM: &str = "apiKey";

/// API-key authentication middleware: resolves the caller and attaches a
/// [`PrincipalContext`] to the request extensions
pub async fn api_key_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = authenticate(&state.principals(), request.headers(), request.uri().query()).await?;
    debug!("Authenticated principal {} ({:?})", principal.id, principal.roles);

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Candidate key from the header, or the query string when no header is sent.
///
/// A present header is decisive: an empty one means no key, whatever the query holds.
pub fn extract_api_key(headers: &HeaderMap, query: Option<&str>) -> Result<Option<String>, AuthError> {
    if let Some(value) = headers.get(API_KEY_HEADER) {
        let key = value
            .to_str()
            .map_err(|_| AuthError::Forbidden(INVALID_API_KEY.to_string()))?;
        return Ok(Some(key.to_string()).filter(|k| !k.is_empty()));
    }

    let from_query = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(name, value)| name == API_KEY_QUERY_PARAM && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    });
    Ok(from_query)
}

/// Resolves the request's API key to a principal with one credential-store read.
///
/// A key of the wrong length is `Forbidden`, not `Unauthenticated`.
pub async fn authenticate(
    principals: &PrincipalRepository,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<PrincipalContext, AuthError> {
    let key = extract_api_key(headers, query)?.ok_or(AuthError::Unauthenticated)?;

    if !auth::is_well_formed(&key) {
        return Err(AuthError::Forbidden(INVALID_API_KEY.to_string()));
    }

    match principals.find_identity_by_hashed_key(&auth::hash_api_key(&key)).await {
        Ok(Some(identity)) => Ok(identity.context()),
        Ok(None) => Err(AuthError::Forbidden(INVALID_API_KEY.to_string())),
        Err(e) => {
            error!("Credential lookup failed: {}", e);
            Err(AuthError::Forbidden(INVALID_API_KEY.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_static("from-header"));
        let key = extract_api_key(&headers, Some("apiKey=from-query")).unwrap();
        assert_eq!(key.as_deref(), Some("from-header"));
    }

    #[test]
    fn falls_back_to_query_parameter() {
        let headers = HeaderMap::new();
        assert_eq!(
            extract_api_key(&headers, Some("x=1&apiKey=abc%20def")).unwrap().as_deref(),
            Some("abc def")
        );
        assert_eq!(extract_api_key(&headers, Some("apikey=abc")).unwrap(), None);
        assert_eq!(extract_api_key(&headers, None).unwrap(), None);
    }

    #[test]
    fn empty_header_does_not_fall_back_to_query() {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_static(""));
        assert_eq!(extract_api_key(&headers, Some("apiKey=q")).unwrap(), None);
        assert_eq!(extract_api_key(&headers, None).unwrap(), None);
    }
}
