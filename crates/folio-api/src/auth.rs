//! Session-cookie authentication and login assertion verification.
//!
//! The fronting identity gateway performs the actual OAuth dance; what
//! reaches this service is a signed assertion (`{openId, timestamp,
//! signature}` plus optional profile fields). A valid assertion is exchanged
//! for a DB-backed session whose raw token travels in the `folio_session`
//! cookie.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use folio_core::defaults::SESSION_COOKIE;
use folio_core::{SessionRepository, User};

use crate::error::ApiError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// COOKIE HANDLING
// =============================================================================

/// Extract the raw session token from the request's `Cookie` header.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

/// Build the `Set-Cookie` value carrying a freshly minted session token.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// Build the `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    )
}

// =============================================================================
// LOGIN ASSERTIONS
// =============================================================================

/// Verify a gateway login assertion signature.
///
/// The gateway signs `"{openId}.{timestamp}"` with HMAC-SHA256 under the
/// shared secret and sends the digest hex-encoded. Comparison happens inside
/// `verify_slice`, which is constant-time.
pub fn verify_assertion(secret: &str, open_id: &str, timestamp: i64, signature_hex: &str) -> bool {
    let signature = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(format!("{}.{}", open_id, timestamp).as_bytes());
    mac.verify_slice(&signature).is_ok()
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Optional session identity.
///
/// Read endpoints use this and degrade to empty or absent results when the
/// request carries no valid session; an invalid cookie is treated the same
/// as no cookie.
#[derive(Debug, Clone)]
pub struct Auth {
    pub user: Option<User>,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match session_token_from_headers(&parts.headers) {
            Some(token) => state.db.sessions.validate(&token).await?,
            None => None,
        };
        Ok(Auth { user })
    }
}

/// Extractor that requires a valid session.
///
/// Mutations use this; a request without one fails with 401 before reaching
/// any repository.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    pub user: User,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = Auth::from_request_parts(parts, state).await?;

        match auth.user {
            Some(user) => Ok(RequireAuth { user }),
            None => Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_token_extracted_from_single_cookie() {
        let headers = headers_with_cookie("folio_session=fol_sess_abc123");
        assert_eq!(
            session_token_from_headers(&headers).as_deref(),
            Some("fol_sess_abc123")
        );
    }

    #[test]
    fn test_token_extracted_among_other_cookies() {
        let headers =
            headers_with_cookie("theme=dark; folio_session=fol_sess_abc123; lang=en-US");
        assert_eq!(
            session_token_from_headers(&headers).as_deref(),
            Some("fol_sess_abc123")
        );
    }

    #[test]
    fn test_missing_or_empty_cookie_yields_none() {
        assert_eq!(session_token_from_headers(&HeaderMap::new()), None);

        let headers = headers_with_cookie("theme=dark");
        assert_eq!(session_token_from_headers(&headers), None);

        let headers = headers_with_cookie("folio_session=");
        assert_eq!(session_token_from_headers(&headers), None);
    }

    #[test]
    fn test_session_cookie_shape() {
        let cookie = session_cookie("fol_sess_abc123", 2_592_000);
        assert!(cookie.starts_with("folio_session=fol_sess_abc123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=2592000"));
        // Must be a valid header value
        assert!(cookie.parse::<HeaderValue>().is_ok());
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert!(cookie.starts_with("folio_session=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.parse::<HeaderValue>().is_ok());
    }

    fn sign(secret: &str, open_id: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", open_id, timestamp).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_assertion_accepts_valid_signature() {
        let sig = sign("secret", "user-1", 1_724_371_200);
        assert!(verify_assertion("secret", "user-1", 1_724_371_200, &sig));
    }

    #[test]
    fn test_verify_assertion_rejects_tampering() {
        let sig = sign("secret", "user-1", 1_724_371_200);

        // Different identity, timestamp, or secret all fail
        assert!(!verify_assertion("secret", "user-2", 1_724_371_200, &sig));
        assert!(!verify_assertion("secret", "user-1", 1_724_371_201, &sig));
        assert!(!verify_assertion("other", "user-1", 1_724_371_200, &sig));
    }

    #[test]
    fn test_verify_assertion_rejects_malformed_hex() {
        assert!(!verify_assertion("secret", "user-1", 0, "not hex at all"));
        assert!(!verify_assertion("secret", "user-1", 0, ""));
    }
}
