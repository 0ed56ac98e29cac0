//! Conditional-request freshness validation (RFC 9110 §13).
//!
//! Decides whether a response may be downgraded to `304 Not Modified` by
//! comparing the request's conditional headers (`If-None-Match`,
//! `If-Modified-Since`) against the response's current validators (`ETag`,
//! `Last-Modified`). Pure functions of one request/response pair; no state.

use chrono::DateTime;

use super::{Headers, Method, StatusCode};

/// Returns `true` when the client's cached copy is still fresh and the
/// response may be collapsed to `304 Not Modified`.
///
/// Rules, applied in order:
///
/// 1. Only `GET` and `HEAD` are eligible for weak freshness validation.
/// 2. Only a 2xx status, or an already-304 status, is eligible (RFC 9110 §15.4.5;
///    an error response is never "not modified").
/// 3. The request conditionals are compared against the response validators;
///    every conditional present on the request must match.
///
/// # Examples
///
/// ```
/// use statik::http::{conditional::is_fresh, Headers, Method, StatusCode};
///
/// let mut req = Headers::new();
/// req.insert("If-None-Match", "\"v1\"");
/// let mut res = Headers::new();
/// res.insert("ETag", "\"v1\"");
///
/// assert!(is_fresh(&Method::Get, &req, StatusCode::Ok, &res));
/// assert!(!is_fresh(&Method::Post, &req, StatusCode::Ok, &res));
/// ```
pub fn is_fresh(
    method: &Method,
    request_headers: &Headers,
    status: StatusCode,
    response_headers: &Headers,
) -> bool {
    // GET or HEAD for weak freshness validation only
    if !method.is_cacheable() {
        return false;
    }

    // 2xx or 304 as per RFC 9110 §15.4.5
    if !status.is_success() && status != StatusCode::NotModified {
        return false;
    }

    validators_match(request_headers, response_headers)
}

/// Compares request conditional headers against response validators.
///
/// A request with no conditionals is never fresh, and an end-to-end reload
/// (`Cache-Control: no-cache` on the request) always forces the full body.
/// Every conditional the request carries must pass: an `If-None-Match`
/// mismatch is stale even when `If-Modified-Since` would match.
pub fn validators_match(request_headers: &Headers, response_headers: &Headers) -> bool {
    let none_match = request_headers.get("if-none-match");
    let modified_since = request_headers.get("if-modified-since");

    if none_match.is_none() && modified_since.is_none() {
        return false;
    }

    if let Some(cache_control) = request_headers.get("cache-control") {
        if has_no_cache_directive(cache_control) {
            return false;
        }
    }

    if let Some(none_match) = none_match {
        if none_match != "*" {
            let Some(etag) = response_headers.get("etag") else {
                return false;
            };
            if !token_list(none_match).any(|candidate| etag_matches(candidate, etag)) {
                return false;
            }
        }
    }

    if let Some(modified_since) = modified_since {
        let fresh = response_headers
            .get("last-modified")
            .and_then(parse_http_date)
            .zip(parse_http_date(modified_since))
            .is_some_and(|(last_modified, since)| last_modified <= since);
        if !fresh {
            return false;
        }
    }

    true
}

// Weak comparison per RFC 9110 §8.8.3.2: the `W/` prefix is ignored on
// either side.
fn etag_matches(candidate: &str, etag: &str) -> bool {
    let strip = |tag: &'_ str| tag.strip_prefix("W/").unwrap_or(tag).to_owned();
    strip(candidate) == strip(etag)
}

fn token_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|t| !t.is_empty())
}

// `no-cache` must appear as a directive, not as a substring of another
// directive's value.
fn has_no_cache_directive(cache_control: &str) -> bool {
    token_list(cache_control).any(|directive| directive.eq_ignore_ascii_case("no-cache"))
}

/// Parses an HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`) into a Unix timestamp.
///
/// The IMF-fixdate grammar is a subset of RFC 2822, which chrono parses
/// directly, obsolete `GMT` zone name included. Unparseable dates yield
/// `None` and are treated as stale by the caller.
fn parse_http_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.timestamp())
}
