//! In-process [`CacheStorage`] backed by nested hash maps.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{CacheKey, CacheStorage};
use crate::BoxFuture;
use crate::error::StorageError;
use crate::http::Response;

/// In-memory named caches.
///
/// Entries live until deleted; there is no eviction. Suitable for tests and
/// for hosts whose caches are process-scoped anyway.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<HashMap<String, HashMap<CacheKey, Response>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in the named cache (zero if it does not exist).
    pub fn len(&self, cache_name: &str) -> usize {
        self.caches.read().get(cache_name).map_or(0, HashMap::len)
    }

    /// Returns `true` if the named cache has no entries.
    pub fn is_empty(&self, cache_name: &str) -> bool {
        self.len(cache_name) == 0
    }

    /// Names of every cache that has been written to.
    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Reads an entry without going through any plugin hooks.
    pub fn peek(&self, cache_name: &str, key: &CacheKey) -> Option<Response> {
        self.caches
            .read()
            .get(cache_name)
            .and_then(|cache| cache.get(key))
            .map(Response::duplicate)
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn get<'a>(
        &'a self,
        cache_name: &'a str,
        key: &'a CacheKey,
    ) -> BoxFuture<'a, Result<Option<Response>, StorageError>> {
        Box::pin(async move { Ok(self.peek(cache_name, key)) })
    }

    fn set<'a>(
        &'a self,
        cache_name: &'a str,
        key: CacheKey,
        response: Response,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            self.caches
                .write()
                .entry(cache_name.to_owned())
                .or_default()
                .insert(key, response);
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        cache_name: &'a str,
        key: &'a CacheKey,
    ) -> BoxFuture<'a, Result<bool, StorageError>> {
        Box::pin(async move {
            let mut caches = self.caches.write();
            Ok(caches
                .get_mut(cache_name)
                .is_some_and(|cache| cache.remove(key).is_some()))
        })
    }
}
