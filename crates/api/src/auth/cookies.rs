//! Auth cookie helpers
//!
//! Tokens travel as httpOnly, Secure, SameSite=None cookies for browser
//! clients; the same values are mirrored in response bodies for non-cookie
//! clients.

use axum::http::{header::COOKIE, HeaderMap};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Find a cookie value by name across all Cookie headers
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Build a Set-Cookie value for an auth token
pub fn build_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!("{name}={value}; Max-Age={max_age_secs}; Path=/; HttpOnly; Secure; SameSite=None")
}

/// Build a Set-Cookie value that expires the cookie immediately
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Max-Age=0; Path=/; HttpOnly; Secure; SameSite=None")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_get_cookie_by_name() {
        let headers = headers_with_cookie("accessToken=abc.def.ghi; refreshToken=xyz");
        assert_eq!(
            get_cookie(&headers, ACCESS_COOKIE).as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE).as_deref(), Some("xyz"));
        assert_eq!(get_cookie(&headers, "sessionId"), None);
    }

    #[test]
    fn test_get_cookie_ignores_whitespace() {
        let headers = headers_with_cookie("theme=dark;  accessToken=tok");
        assert_eq!(get_cookie(&headers, ACCESS_COOKIE).as_deref(), Some("tok"));
    }

    #[test]
    fn test_get_cookie_missing_header() {
        assert_eq!(get_cookie(&HeaderMap::new(), ACCESS_COOKIE), None);
    }

    #[test]
    fn test_build_and_clear_cookie() {
        let cookie = build_cookie(ACCESS_COOKIE, "tok", 172_800);
        assert!(cookie.starts_with("accessToken=tok; Max-Age=172800"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));

        let cleared = clear_cookie(REFRESH_COOKIE);
        assert!(cleared.starts_with("refreshToken=; Max-Age=0"));
    }
}
