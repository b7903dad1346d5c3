//! HTTP caching validators for dashboard responses.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

/// Compute a weakly-stable quoted ETag from response bytes.
pub fn compute_etag(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// `max-age=N, stale-while-revalidate=M`
pub fn cache_control(max_age: u32, swr: u32) -> String {
    format!("max-age={}, stale-while-revalidate={}", max_age, swr)
}

/// RFC 7231 HTTP-date.
pub fn http_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Returns true when `If-None-Match` contains `*` or the exact current ETag.
pub fn if_none_match_matches(headers: &HeaderMap, current_etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .map(|tag| tag.trim())
                .any(|tag| tag == "*" || tag == current_etag)
        })
        .unwrap_or(false)
}

/// Cache policy for one JSON resource
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub max_age: u32,
    pub stale_while_revalidate: u32,
}

impl CachePolicy {
    /// Serve `body` as JSON, or `304 Not Modified` when the client already
    /// holds the same ETag.
    pub fn respond(
        &self,
        request_headers: &HeaderMap,
        body: Vec<u8>,
        modified_at: Option<DateTime<Utc>>,
    ) -> Response {
        let etag = compute_etag(&body);
        let not_modified = if_none_match_matches(request_headers, &etag);

        let mut builder = Response::builder()
            .status(if not_modified { StatusCode::NOT_MODIFIED } else { StatusCode::OK })
            .header(
                header::CACHE_CONTROL,
                cache_control(self.max_age, self.stale_while_revalidate),
            )
            .header(header::ETAG, etag.as_str());
        if let Some(modified_at) = modified_at {
            builder = builder.header(header::LAST_MODIFIED, http_date(modified_at));
        }

        let response = if not_modified {
            builder.body(Body::empty())
        } else {
            builder
                .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(Body::from(body))
        };

        response.unwrap_or_else(|err| {
            tracing::error!("Failed to build cached response: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const POLICY: CachePolicy = CachePolicy {
        max_age: 30,
        stale_while_revalidate: 60,
    };

    #[test]
    fn etag_is_quoted_and_stable() {
        let etag = compute_etag(br#"{"ok":true}"#);
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
        assert_eq!(etag, compute_etag(br#"{"ok":true}"#));
    }

    #[test]
    fn if_none_match_accepts_lists_and_wildcard() {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"x\", \"abc\""));
        assert!(if_none_match_matches(&headers, "\"abc\""));
        assert!(!if_none_match_matches(&headers, "\"def\""));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(if_none_match_matches(&headers, "\"def\""));
    }

    #[test]
    fn http_date_uses_gmt_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        assert_eq!(http_date(at), "Fri, 15 Mar 2024 12:00:00 GMT");
    }

    #[test]
    fn respond_sets_validators() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let response = POLICY.respond(&HeaderMap::new(), b"{}".to_vec(), Some(at));

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CACHE_CONTROL], "max-age=30, stale-while-revalidate=60");
        assert_eq!(headers[header::LAST_MODIFIED], "Fri, 15 Mar 2024 12:00:00 GMT");
        assert!(headers.contains_key(header::ETAG));
    }

    #[test]
    fn respond_returns_304_for_matching_etag() {
        let body = b"{\"a\":1}".to_vec();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_str(&compute_etag(&body)).unwrap(),
        );

        let response = POLICY.respond(&headers, body, None);

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(!response.headers().contains_key(header::CONTENT_TYPE));
    }
}
