//! Shared value types for binrest.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! data across the codec/transport boundary: the encoded [`Payload`], the
//! request and response header collections, the normalised
//! [`SimpleResponse`], and the [`WireFormat`] marker sent with every request.

use http::header::{HeaderMap, HeaderName, HeaderValue, IntoHeaderName};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire constants
// ---------------------------------------------------------------------------

/// Media type of every request and response body.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// `Accept` header name.
pub const ACCEPT: &str = "Accept";

/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Header naming the wire format and version of the body.
pub const X_SERIALIZER: &str = "X-Serializer";

/// Maximum number of characters of a failure body embedded in an error message.
pub const SNIPPET_LIMIT: usize = 512;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Raw encoded bytes produced by the codec.
///
/// Immutable once produced; the codec never hands out an empty payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Wraps encoded bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the number of encoded bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the payload, returning the bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`; carries no body.
    Get,
    /// `POST`; carries an encoded body.
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// Headers of an outgoing request: one value per name.
///
/// Names compare case-insensitively; inserting a name that is already present
/// (in any case) replaces the existing entry in place. Iteration follows
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders(Vec<(String, String)>);

impl RequestHeaders {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing any entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(entry) => *entry = (name, value),
            None => self.0.push((name, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts only if `name` is not present yet.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.0.push((name, value.into()));
        }
    }

    /// Returns the value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.0.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.0.remove(idx).1)
    }

    /// Returns a copy of `defaults` with every entry of `self` laid over it.
    ///
    /// Entries of `self` win on a name collision.
    pub fn merged_over(&self, defaults: &RequestHeaders) -> RequestHeaders {
        let mut merged = defaults.clone();
        for (name, value) in &self.0 {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Headers of a received response, exactly as they arrived.
///
/// Backed by an [`http::HeaderMap`]: names compare case-insensitively, every
/// name keeps its values in arrival order, and values stay raw bytes (a value
/// that is not valid UTF-8 is kept as-is, never replaced).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders(HeaderMap);

impl ResponseHeaders {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` under `name`, keeping earlier values.
    pub fn append<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) {
        self.0.append(name, value);
    }

    /// Returns the first value of `name`.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.0.get(name)
    }

    /// Returns the first value of `name` if it is visible ASCII text.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns every value of `name`, in arrival order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.0.get_all(name).into_iter()
    }

    /// Iterates `(name, value)` pairs; repeated names yield one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.0.iter()
    }

    /// Number of values, counting repeats of a name separately.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying map.
    pub fn as_map(&self) -> &HeaderMap {
        &self.0
    }
}

impl From<HeaderMap> for ResponseHeaders {
    fn from(map: HeaderMap) -> Self {
        Self(map)
    }
}

impl From<ResponseHeaders> for HeaderMap {
    fn from(headers: ResponseHeaders) -> Self {
        headers.0
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// The normalised result of one HTTP exchange.
///
/// Immutable: the `with_*` methods used by response interceptors consume the
/// response and return a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleResponse {
    status: u16,
    headers: ResponseHeaders,
    body: Vec<u8>,
}

impl SimpleResponse {
    /// Creates a response.
    pub fn new(status: u16, headers: ResponseHeaders, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// Exact bytes of the response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns `true` if the status is in `[200, 299]`.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Consumes the response, returning the body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Returns this response with `status` replaced.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Returns this response with `body` replaced.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Returns this response with `value` appended under `name`.
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}

/// Renders a response body as printable text for an error message.
///
/// Valid UTF-8 is used as-is, anything else becomes `"<N bytes>"`. Text longer
/// than [`SNIPPET_LIMIT`] characters is cut and suffixed with `"..."`.
pub fn body_snippet(body: &[u8]) -> String {
    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(_) => return format!("<{} bytes>", body.len()),
    };
    match text.char_indices().nth(SNIPPET_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Name and version of the binary wire format, sent as [`X_SERIALIZER`].
///
/// Renders as `<name>-v<version>`, e.g. `kryo-binary-v1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireFormat {
    /// Format family.
    pub name: &'static str,
    /// Version; bumped on breaking changes.
    pub version: u32,
}

/// The wire format spoken by this workspace.
pub const KRYO_BINARY_V1: WireFormat = WireFormat::new("kryo-binary", 1);

impl WireFormat {
    /// Creates a new [`WireFormat`].
    pub const fn new(name: &'static str, version: u32) -> Self {
        Self { name, version }
    }

    /// Returns `true` if a peer's `X-Serializer` value names this format.
    ///
    /// Compatibility requires the same name and version; case is ignored.
    pub fn matches_header(self, value: &str) -> bool {
        value.trim().eq_ignore_ascii_case(&self.to_string())
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-v{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_headers_replace_case_insensitively() {
        let mut headers = RequestHeaders::new().with("Accept", "text/plain");
        headers.insert("accept", OCTET_STREAM);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("ACCEPT"), Some(OCTET_STREAM));
    }

    #[test]
    fn caller_headers_win_when_merged_over_defaults() {
        let defaults = RequestHeaders::new()
            .with(ACCEPT, OCTET_STREAM)
            .with(X_SERIALIZER, "kryo-binary-v1");
        let caller = RequestHeaders::new()
            .with("x-serializer", "custom-v9")
            .with("Authorization", "Bearer t");

        let merged = caller.merged_over(&defaults);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(X_SERIALIZER), Some("custom-v9"));
        assert_eq!(merged.get(ACCEPT), Some(OCTET_STREAM));
        assert_eq!(merged.get("authorization"), Some("Bearer t"));
    }

    #[test]
    fn insert_if_absent_keeps_existing_value() {
        let mut headers = RequestHeaders::new().with("content-type", "text/plain");
        headers.insert_if_absent(CONTENT_TYPE, OCTET_STREAM);
        assert_eq!(headers.get(CONTENT_TYPE), Some("text/plain"));
        assert_eq!(headers.remove("Content-Type").as_deref(), Some("text/plain"));
        assert!(headers.is_empty());
    }

    #[test]
    fn response_headers_group_values_in_order() {
        let mut headers = ResponseHeaders::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("content-type", HeaderValue::from_static("x"));
        headers.append(HeaderName::from_static("set-cookie"), HeaderValue::from_static("b=2"));

        assert_eq!(headers.len(), 3);
        let cookies: Vec<_> = headers.get_all("SET-COOKIE").collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
        assert_eq!(headers.get_str("Content-Type"), Some("x"));
        assert_eq!(headers.get_all("missing").count(), 0);
    }

    #[test]
    fn response_header_values_keep_their_bytes() {
        let raw = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        let headers: ResponseHeaders = [(HeaderName::from_static("x-bin"), raw)].into_iter().collect();

        assert_eq!(headers.get("X-Bin").map(HeaderValue::as_bytes), Some(&b"caf\xe9"[..]));
        assert_eq!(headers.get_str("x-bin"), None);
    }

    #[test]
    fn success_range_is_inclusive() {
        let ok = |s| SimpleResponse::new(s, ResponseHeaders::new(), Vec::new()).is_success();
        assert!(ok(200));
        assert!(ok(299));
        assert!(!ok(199));
        assert!(!ok(300));
        assert!(!ok(400));
    }

    #[test]
    fn with_methods_leave_other_fields_alone() {
        let response = SimpleResponse::new(200, ResponseHeaders::new(), b"abc".to_vec())
            .with_status(201)
            .with_header("x-trace", HeaderValue::from_static("1"));
        assert_eq!(response.status(), 201);
        assert_eq!(response.body(), b"abc");
        assert_eq!(response.headers().get_str("X-Trace"), Some("1"));
    }

    #[test]
    fn snippet_of_utf8_text_is_verbatim() {
        assert_eq!(body_snippet(b"bad request"), "bad request");
    }

    #[test]
    fn snippet_of_binary_body_is_a_placeholder() {
        assert_eq!(body_snippet(&[0xff, 0xfe, 0x00]), "<3 bytes>");
    }

    #[test]
    fn snippet_is_truncated_on_a_char_boundary() {
        let long = "é".repeat(SNIPPET_LIMIT + 10);
        let snippet = body_snippet(long.as_bytes());
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), SNIPPET_LIMIT + 3);

        let exact = "a".repeat(SNIPPET_LIMIT);
        assert_eq!(body_snippet(exact.as_bytes()), exact);
    }

    #[test]
    fn wire_format_renders_marker() {
        assert_eq!(KRYO_BINARY_V1.to_string(), "kryo-binary-v1");
        assert!(KRYO_BINARY_V1.matches_header(" Kryo-Binary-V1 "));
        assert!(!KRYO_BINARY_V1.matches_header("kryo-binary-v2"));
    }

    #[test]
    fn payload_exposes_bytes() {
        let payload = Payload::from(vec![1, 2, 3]);
        assert_eq!(payload.len(), 3);
        assert!(!payload.is_empty());
        assert_eq!(payload.as_ref(), &[1, 2, 3]);
        assert_eq!(payload.into_vec(), vec![1, 2, 3]);
    }
}
