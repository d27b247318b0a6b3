use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::response::Json;
use modern_blog_shared::models::UserRecord;

use crate::handlers::{error_response, unauthorized, ApiError};
use crate::state::AppState;

/// The authenticated requester, resolved from a `Bearer` session token.
/// Routes take `AuthUser` to require login, `Option<AuthUser>` to
/// personalize public pages.
pub struct AuthUser(pub UserRecord);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Err(unauthorized());
        };
        match state.accounts.user_for_token(&token) {
            Ok(Some(user)) => Ok(AuthUser(user)),
            Ok(None) => Err(unauthorized()),
            Err(err) => Err(error_response("resolve session token", err)),
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::bearer_token;
    use axum::http::{header, HeaderMap, HeaderValue};

    #[test]
    fn bearer_token_parses_the_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc-123"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_blank_tokens() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(bearer_token(&headers).is_none());

        let empty = HeaderMap::new();
        assert!(bearer_token(&empty).is_none());
    }
}
