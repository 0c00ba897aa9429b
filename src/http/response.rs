//! Response values produced by the network or read back from a cache.
//!
//! A [`Response`] is not `Clone`. Its body is treated as single-consumption:
//! whenever two parties need the same bytes (the caller and a pending cache
//! write) one of them must receive an explicit [`Response::duplicate`].

use bytes::Bytes;

use super::{Headers, StatusCode};

/// How a response relates to the origin that served it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseType {
    /// Same-origin response.
    #[default]
    Basic,
    /// Cross-origin response with CORS headers; fully readable.
    Cors,
    /// Cross-origin response without CORS; status and body are hidden.
    Opaque,
    /// Network-level error response.
    Error,
}

/// Which facade produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseSource {
    #[default]
    Network,
    Cache,
}

/// An immutable-once-produced response.
///
/// # Examples
///
/// ```
/// use rtcache::http::{Response, StatusCode};
///
/// let original = Response::new(StatusCode::OK)
///     .header("Content-Type", "text/plain")
///     .body("hello");
///
/// let copy = original.duplicate();
/// assert_eq!(original.text().unwrap(), "hello");
/// assert_eq!(copy.text().unwrap(), "hello");
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
    kind: ResponseType,
    source: ResponseSource,
}

impl Response {
    /// Creates a new basic response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
            kind: ResponseType::Basic,
            source: ResponseSource::Network,
        }
    }

    /// Creates an opaque cross-origin response: status `0`, no headers, empty body.
    pub fn opaque() -> Self {
        Self::new(StatusCode::OPAQUE).kind(ResponseType::Opaque)
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the response body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Bytes::from(body.into());
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the response type.
    #[must_use]
    pub fn kind(mut self, kind: ResponseType) -> Self {
        self.kind = kind;
        self
    }

    /// Produces an independent copy of this response, body included.
    ///
    /// The body buffer is reference counted, so this does not copy bytes.
    pub fn duplicate(&self) -> Self {
        Self {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            kind: self.kind,
            source: self.source,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns a mutable view of the headers, for plugins that decorate responses.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn response_type(&self) -> ResponseType {
        self.kind
    }

    pub fn source(&self) -> ResponseSource {
        self.source
    }

    /// Returns `true` if this response was read back from a cache.
    pub fn is_from_cache(&self) -> bool {
        self.source == ResponseSource::Cache
    }

    pub fn is_opaque(&self) -> bool {
        self.kind == ResponseType::Opaque
    }

    /// Returns `true` for a readable `2xx` response.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the size of the body in bytes.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// Consumes the response and returns its body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Consumes the response and decodes its body as UTF-8.
    pub fn text(self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    /// Consumes the response and deserializes its body as JSON.
    pub fn json<T>(self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(&self.body)
    }

    pub(crate) fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_shares_bytes_and_metadata() {
        let original = Response::new(StatusCode::CREATED)
            .header("ETag", "\"v1\"")
            .body("payload")
            .with_source(ResponseSource::Cache);
        let copy = original.duplicate();

        assert_eq!(copy.status(), StatusCode::CREATED);
        assert_eq!(copy.headers().get("etag"), Some("\"v1\""));
        assert!(copy.is_from_cache());
        assert_eq!(original.into_body(), copy.into_body());
    }

    #[test]
    fn opaque_hides_status() {
        let r = Response::opaque();
        assert!(r.is_opaque());
        assert_eq!(r.status(), StatusCode::OPAQUE);
        assert!(!r.is_success());
        assert_eq!(r.content_length(), 0);
    }

    #[test]
    fn json_body() {
        #[derive(serde::Deserialize)]
        struct Payload {
            status: String,
        }

        let r = Response::new(StatusCode::OK).body(r#"{"status":"ok"}"#);
        let payload: Payload = r.json().unwrap();
        assert_eq!(payload.status, "ok");
    }

    #[test]
    fn default_is_network_ok() {
        let r = Response::default();
        assert_eq!(r.status(), StatusCode::OK);
        assert_eq!(r.source(), ResponseSource::Network);
        assert_eq!(r.response_type(), ResponseType::Basic);
    }
}
