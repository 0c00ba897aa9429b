//! Outbound request descriptor.

use super::{Headers, Method};

/// An immutable description of an outbound lookup.
///
/// The same value serves as the network fetch input and as the cache lookup
/// key. Plugins that rewrite requests (for example to strip a query string
/// before the cache sees it) produce a new `Request` rather than mutating the
/// caller's.
///
/// # Examples
///
/// ```
/// use rtcache::http::{Method, Request};
///
/// let request = Request::get("https://example.com/search?q=rust")
///     .header("Accept", "application/json");
///
/// assert_eq!(request.method(), &Method::Get);
/// assert_eq!(request.path(), "/search");
/// assert_eq!(request.query_string(), Some("q=rust"));
/// assert_eq!(request.without_query().url(), "https://example.com/search");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: String,
    headers: Headers,
}

impl Request {
    /// Creates a request with the given method and URL and no headers.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
        }
    }

    /// Shorthand for `Request::new(Method::Get, url)`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns a copy of this request pointed at a different URL.
    #[must_use]
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            method: self.method.clone(),
            url: url.into(),
            headers: self.headers.clone(),
        }
    }

    /// Returns a copy of this request with its query string and fragment removed.
    #[must_use]
    pub fn without_query(&self) -> Self {
        let end = self.url.find(['?', '#']).unwrap_or(self.url.len());
        self.with_url(&self.url[..end])
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the full URL as supplied.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the path component, without scheme, authority, query or fragment.
    pub fn path(&self) -> &str {
        let rest = match self.url.find("://") {
            Some(pos) => {
                let after_scheme = &self.url[pos + 3..];
                match after_scheme.find('/') {
                    Some(slash) => &after_scheme[slash..],
                    None => "/",
                }
            }
            None => self.url.as_str(),
        };
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        &rest[..end]
    }

    /// Returns the raw query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        let start = self.url.find('?')? + 1;
        let rest = &self.url[start..];
        let end = rest.find('#').unwrap_or(rest.len());
        Some(&rest[..end])
    }
}
