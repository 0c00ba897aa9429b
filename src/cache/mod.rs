//! Cache storage: the key/value store collaborator and the facade in front of it.
//!
//! - [`CacheStorage`]: trait implemented by the underlying named-cache store.
//! - [`MemoryCacheStorage`]: in-process implementation backed by a hash map.
//! - [`CacheAccess`]: the only path strategies use to read or write a cache;
//!   it runs the plugin hooks around every operation.

use std::fmt;

use crate::BoxFuture;
use crate::error::StorageError;
use crate::http::{Method, Request, Response};

pub mod access;
pub mod memory;

pub use access::CacheAccess;
pub use memory::MemoryCacheStorage;

/// Identity of a cache entry, derived from a (possibly rewritten) request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    url: String,
}

impl CacheKey {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl From<&Request> for CacheKey {
    fn from(request: &Request) -> Self {
        Self::new(request.method().clone(), request.url())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A store of named caches, each mapping [`CacheKey`]s to responses.
///
/// Implementations must be shareable across tasks. Every call is a
/// suspension point; the engine never holds locks across one.
///
/// `get` hands back an independent response (a duplicate of whatever is
/// stored), so the stored entry stays readable for later lookups.
pub trait CacheStorage: Send + Sync {
    fn get<'a>(
        &'a self,
        cache_name: &'a str,
        key: &'a CacheKey,
    ) -> BoxFuture<'a, Result<Option<Response>, StorageError>>;

    fn set<'a>(
        &'a self,
        cache_name: &'a str,
        key: CacheKey,
        response: Response,
    ) -> BoxFuture<'a, Result<(), StorageError>>;

    /// Removes an entry. Returns `true` if one existed.
    fn delete<'a>(
        &'a self,
        cache_name: &'a str,
        key: &'a CacheKey,
    ) -> BoxFuture<'a, Result<bool, StorageError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_request_ignores_headers() {
        let a = Request::get("/a").header("Accept", "text/html");
        let b = Request::get("/a");
        assert_eq!(CacheKey::from(&a), CacheKey::from(&b));
    }

    #[test]
    fn key_distinguishes_method() {
        let get = CacheKey::from(&Request::get("/a"));
        let head = CacheKey::from(&Request::new(Method::Head, "/a"));
        assert_ne!(get, head);
        assert_eq!(head.to_string(), "HEAD /a");
    }
}
