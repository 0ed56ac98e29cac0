//! HTTP/1.1 response builder.
//!
//! Provides a fluent builder API for constructing HTTP responses, an in-place
//! mutation API for middleware that decorates a response as it travels through
//! the pipeline, and serialization to a byte buffer for transmission over TCP.

use bytes::{BufMut, BytesMut};

use super::{Headers, StatusCode};

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use statik::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    keep_alive: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            keep_alive: true,
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header in-place. Intended for middleware pipelines that receive
    /// a `Response` from downstream and need to decorate it without consuming it.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Replaces any existing values for a header with a single value, in-place.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Removes a header (case-insensitive), in-place. Returns `true` if present.
    pub fn remove_header(&mut self, name: &str) -> bool {
        self.headers.remove(name)
    }

    /// Sets the response body from a string.
    ///
    /// The `Content-Length` header is written automatically by [`into_bytes`](Self::into_bytes).
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Replaces the response body in-place.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Discards the response body, leaving status and headers intact.
    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    /// Removes the entity headers that must not accompany a bodiless response:
    /// `Content-Type`, `Content-Length`, and `Transfer-Encoding`.
    pub fn strip_entity_headers(&mut self) {
        self.headers.remove("Content-Type");
        self.headers.remove("Content-Length");
        self.headers.remove("Transfer-Encoding");
    }

    /// Controls whether the `Connection: keep-alive` or `Connection: close` header is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Replaces the status code in-place.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the response body bytes.
    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    /// Serializes the response into a `BytesMut` buffer using HTTP/1.1 wire format.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain; charset=utf-8` if the body is non-empty and no
    ///   `Content-Type` header was set.
    /// - `Content-Length: <n>` — except for `204` and `304` responses, which carry
    ///   no entity and no entity headers.
    /// - `Connection: keep-alive` or `Connection: close`.
    pub fn into_bytes(self) -> BytesMut {
        self.serialize(true)
    }

    /// Serializes like [`into_bytes`](Self::into_bytes) but omits the body
    /// while keeping the entity headers — `Content-Length` included —
    /// exactly as written for the equivalent `GET`. This is the wire form
    /// RFC 9110 §9.3.2 requires for responses to `HEAD` requests.
    pub fn into_bytes_without_body(self) -> BytesMut {
        self.serialize(false)
    }

    fn serialize(mut self, include_body: bool) -> BytesMut {
        let content_length = self.body.len();
        let bodiless =
            matches!(self.status, StatusCode::NoContent | StatusCode::NotModified);

        if !self.body.is_empty() && !self.headers.contains("content-type") {
            self.headers
                .insert("Content-Type", "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive {
            "keep-alive"
        } else {
            "close"
        };
        self.headers.insert("Connection", connection);

        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        // Status line
        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        // Headers
        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        // Content-Length is always the last header before the blank line
        if !bodiless {
            buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        }

        // Header/body separator
        buf.put(&b"\r\n"[..]);

        // Body
        if include_body && !bodiless && !self.body.is_empty() {
            buf.put(self.body.as_slice());
        }

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn simple_ok_response() {
        let r = Response::new(StatusCode::Ok).body("Hello");
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn custom_header() {
        let r = Response::new(StatusCode::Ok)
            .header("X-Request-Id", "abc-123")
            .body("ok");
        let s = to_string(r.into_bytes());
        assert!(s.contains("X-Request-Id: abc-123\r\n"));
    }

    #[test]
    fn set_status_in_place() {
        let mut r = Response::new(StatusCode::Ok).body("stale");
        r.set_status(StatusCode::NotModified);
        assert_eq!(r.status(), StatusCode::NotModified);
    }

    #[test]
    fn set_header_replaces() {
        let mut r = Response::new(StatusCode::Ok).header("Cache-Control", "public");
        r.set_header("Cache-Control", "no-cache");
        assert_eq!(r.headers().get("cache-control"), Some("no-cache"));
        let count = r.headers().get_all("cache-control").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn strip_entity_headers_removes_all_three() {
        let mut r = Response::new(StatusCode::NotModified)
            .header("Content-Type", "text/css")
            .header("Content-Length", "42")
            .header("Transfer-Encoding", "chunked")
            .header("ETag", "\"abc\"");
        r.strip_entity_headers();
        assert!(!r.headers().contains("content-type"));
        assert!(!r.headers().contains("content-length"));
        assert!(!r.headers().contains("transfer-encoding"));
        assert!(r.headers().contains("etag"));
    }

    #[test]
    fn not_modified_has_no_content_length() {
        let r = Response::new(StatusCode::NotModified);
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 304 Not Modified\r\n"));
        assert!(!s.contains("Content-Length"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn connection_close() {
        let r = Response::new(StatusCode::Ok).keep_alive(false);
        let s = to_string(r.into_bytes());
        assert!(s.contains("Connection: close\r\n"));
    }

    #[test]
    fn head_serialization_keeps_length_drops_body() {
        let r = Response::new(StatusCode::Ok)
            .header("Content-Type", "application/javascript")
            .body("console.log('app');");
        let s = to_string(r.into_bytes_without_body());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Type: application/javascript\r\n"));
        assert!(s.contains("Content-Length: 19\r\n"));
        assert!(s.ends_with("\r\n\r\n"));
    }
}
