//! Shared collaborators handed to every strategy.

use std::sync::Arc;

use crate::cache::{CacheAccess, CacheStorage};
use crate::config::CacheNames;
use crate::network::{NetworkAccess, Transport};

/// The cache store, the network transport, and the cache naming scheme.
///
/// One context is usually built per host and shared by all strategies; the
/// store behind it is shared across every strategy instance and request.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rtcache::cache::MemoryCacheStorage;
/// use rtcache::context::CacheContext;
/// use rtcache::http::{Response, StatusCode};
/// use rtcache::network::transport_fn;
///
/// let context = CacheContext::new(
///     Arc::new(MemoryCacheStorage::new()),
///     transport_fn(|_req| async { Ok(Response::new(StatusCode::OK)) }),
/// );
/// assert_eq!(context.cache_names().runtime_name(), "rtcache-runtime");
/// ```
#[derive(Clone)]
pub struct CacheContext {
    storage: Arc<dyn CacheStorage>,
    transport: Arc<dyn Transport>,
    cache_names: CacheNames,
}

impl CacheContext {
    pub fn new(storage: Arc<dyn CacheStorage>, transport: Arc<dyn Transport>) -> Self {
        Self {
            storage,
            transport,
            cache_names: CacheNames::default(),
        }
    }

    #[must_use]
    pub fn with_cache_names(mut self, cache_names: CacheNames) -> Self {
        self.cache_names = cache_names;
        self
    }

    pub fn cache_names(&self) -> &CacheNames {
        &self.cache_names
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub(crate) fn cache_access(&self) -> CacheAccess {
        CacheAccess::new(Arc::clone(&self.storage))
    }

    pub(crate) fn network_access(&self) -> NetworkAccess {
        NetworkAccess::new(Arc::clone(&self.transport))
    }
}

impl std::fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheContext")
            .field("cache_names", &self.cache_names)
            .finish_non_exhaustive()
    }
}
