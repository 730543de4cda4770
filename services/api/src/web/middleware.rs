//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use booking_core::ports::PortError;
use std::sync::Arc;
use tracing::debug;

use crate::{error::ApiError, web::state::AppState};

/// Pulls the login session id from the `session` cookie, falling back to a
/// `Bearer` token for non-browser clients.
fn session_id(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|c| c.trim().strip_prefix("session="))
        });

    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session and extracts the user_id.
///
/// If valid, inserts the user_id into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_session_id = session_id(req.headers())
        .ok_or(ApiError::Port(PortError::Unauthorized))?
        .to_string();

    let user_id = state
        .auth
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            debug!("Rejected auth session: {:?}", e);
            match e {
                PortError::Unexpected(_) => ApiError::Port(e),
                _ => ApiError::Port(PortError::Unauthorized),
            }
        })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn reads_the_session_cookie_among_others() {
        let map = headers(&[(header::COOKIE, "theme=dark; session=abc123; lang=ko")]);
        assert_eq!(session_id(&map), Some("abc123"));
    }

    #[test]
    fn falls_back_to_a_bearer_token() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer tok-9")]);
        assert_eq!(session_id(&map), Some("tok-9"));
    }

    #[test]
    fn empty_or_missing_credentials_yield_nothing() {
        assert_eq!(session_id(&HeaderMap::new()), None);
        assert_eq!(session_id(&headers(&[(header::COOKIE, "session=")])), None);
        assert_eq!(session_id(&headers(&[(header::AUTHORIZATION, "Basic Zm9v")])), None);
    }
}
