use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};

use crate::ApiError;

pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }

    Ok(token.to_string())
}

/// Bearer token if present, otherwise the session cookie.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Ok(token) = require_bearer(headers) {
        return Some(token);
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(
    name: &str,
    token: String,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> Cookie<'static> {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    Cookie::build((name.to_string(), token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time_seconds(max_age))
        .build()
}

pub fn expired_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), String::new()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time_seconds(0))
        .build()
}

fn time_seconds(seconds: i64) -> time::Duration {
    time::Duration::seconds(seconds)
}

/// Only same-site absolute paths are accepted as post-login targets.
pub fn safe_return_path(candidate: Option<&str>) -> Option<String> {
    let candidate = candidate?.trim();
    let is_local = candidate.starts_with('/')
        && !candidate.starts_with("//")
        && !candidate.starts_with("/\\")
        && !candidate.contains("://");
    is_local.then(|| candidate.to_string())
}

/// `/auth` with the requested destination attached.
pub fn login_redirect(return_to: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(return_to.as_bytes()).collect();
    format!("/auth?redirect_to={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};

    #[test]
    fn require_bearer_extracts_token_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer TOKEN123"));

        let token = require_bearer(&headers).expect("token should be extracted");
        assert_eq!(token, "TOKEN123");
    }

    #[test]
    fn require_bearer_rejects_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));

        let error = require_bearer(&headers).expect_err("should reject missing token");
        assert_eq!(error.status, axum::http::StatusCode::UNAUTHORIZED);
        assert!(error.message.contains("missing bearer token"));
    }

    #[test]
    fn session_token_falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; cadence_session=cookie-token"),
        );

        assert_eq!(
            session_token(&headers, "cadence_session").as_deref(),
            Some("cookie-token")
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(
            session_token(&headers, "cadence_session").as_deref(),
            Some("header-token")
        );
    }

    #[test]
    fn return_paths_must_stay_on_site() {
        assert_eq!(
            safe_return_path(Some("/dashboard/meetings")).as_deref(),
            Some("/dashboard/meetings")
        );
        assert!(safe_return_path(Some("//evil.example.com")).is_none());
        assert!(safe_return_path(Some("https://evil.example.com")).is_none());
        assert!(safe_return_path(Some("dashboard")).is_none());
        assert!(safe_return_path(None).is_none());
    }

    #[test]
    fn login_redirect_encodes_destination() {
        assert_eq!(
            login_redirect("/dashboard/billing"),
            "/auth?redirect_to=%2Fdashboard%2Fbilling"
        );
    }
}
