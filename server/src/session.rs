//! Cookie-backed sessions.
//!
//! Both user and admin sessions are rows keyed by a random token carried in
//! an HttpOnly cookie. The two are fully independent: an admin cookie grants
//! nothing on the play surface and vice versa.

use axum::http::{header::COOKIE, HeaderMap};
use rand::distributions::{Alphanumeric, Distribution};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{database, error::AppError, models::User, state::AppState};

const TOKEN_LENGTH: usize = 64;
const COOKIE_MAX_AGE_SECONDS: u32 = 6 * 60 * 60;

pub const USER_COOKIE: &str = "session_token";
pub const ADMIN_COOKIE: &str = "admin_token";

pub fn mint_token() -> String {
    let mut rng = StdRng::from_entropy();
    String::from_iter((0..TOKEN_LENGTH).map(|_| Alphanumeric.sample(&mut rng) as char))
}

pub fn set_cookie(name: &str, token: &str) -> String {
    format!("{name}={token}; Max-Age={COOKIE_MAX_AGE_SECONDS}; Path=/; HttpOnly; SameSite=Strict")
}

pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Max-Age=0; Path=/; HttpOnly; SameSite=Strict")
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    for cookie in header.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Resolve the signed-in user, if the request carries a live session.
pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, AppError> {
    match cookie_value(headers, USER_COOKIE) {
        Some(token) => Ok(database::session_user(&state.pool, &token).await?),
        None => Ok(None),
    }
}

pub async fn is_admin(state: &AppState, headers: &HeaderMap) -> Result<bool, AppError> {
    match cookie_value(headers, ADMIN_COOKIE) {
        Some(token) => Ok(database::admin_session_valid(&state.pool, &token).await?),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_token_shape() {
        let token = mint_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, mint_token());
    }

    #[test]
    fn test_cookie_round_trip() {
        let cookie = set_cookie(USER_COOKIE, "abc123");
        let mut headers = HeaderMap::new();
        // Browsers echo back only the name=value pair.
        headers.insert(
            COOKIE,
            HeaderValue::from_str(cookie.split(';').next().unwrap()).unwrap(),
        );
        assert_eq!(cookie_value(&headers, USER_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, ADMIN_COOKIE), None);
    }

    #[test]
    fn test_cookie_parse_with_siblings() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; session_token=tok42; other=1"),
        );
        assert_eq!(cookie_value(&headers, USER_COOKIE).as_deref(), Some("tok42"));
    }

    #[test]
    fn test_clear_cookie_expires() {
        assert!(clear_cookie(ADMIN_COOKIE).contains("Max-Age=0"));
    }
}
