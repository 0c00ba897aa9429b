//! Cache access facade.
//!
//! Every cache read and write made by a strategy goes through [`CacheAccess`],
//! so plugin hooks can never be bypassed. The facade applies no policy of its
//! own: without plugins it stores whatever it is given, whatever the status.

use std::sync::Arc;

use tracing::debug;

use super::{CacheKey, CacheStorage};
use crate::error::Error;
use crate::http::{Request, Response, ResponseSource};
use crate::plugin::{Hook, PluginChain};

/// A request whose cache key has been resolved through `cache_key_will_be_used`.
///
/// Resolving once and reusing the target for both the lookup and the later
/// write guarantees the two operations agree on the key. The rewritten
/// request is what every subsequent cache hook receives.
#[derive(Debug, Clone)]
pub struct CacheTarget {
    cache_name: String,
    request: Request,
}

impl CacheTarget {
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// The rewritten request the key is derived from.
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::from(&self.request)
    }
}

/// Plugin-aware front end for a [`CacheStorage`].
#[derive(Clone)]
pub struct CacheAccess {
    storage: Arc<dyn CacheStorage>,
}

impl CacheAccess {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }

    /// Runs the `cache_key_will_be_used` chain and pins the result to `cache_name`.
    pub async fn resolve(
        &self,
        cache_name: &str,
        request: &Request,
        plugins: &PluginChain,
    ) -> Result<CacheTarget, Error> {
        let request = plugins.cache_key_will_be_used(request.clone()).await?;
        Ok(CacheTarget {
            cache_name: cache_name.to_owned(),
            request,
        })
    }

    /// Looks up a resolved target.
    ///
    /// A physical hit vetoed by `cached_response_will_be_used` is reported as
    /// a miss.
    pub async fn lookup(
        &self,
        target: &CacheTarget,
        plugins: &PluginChain,
    ) -> Result<Option<Response>, Error> {
        let key = target.key();
        let Some(cached) = self.storage.get(&target.cache_name, &key).await? else {
            debug!(cache = %target.cache_name, key = %key, "cache miss");
            return Ok(None);
        };

        let cached = cached.with_source(ResponseSource::Cache);
        let response = plugins
            .cached_response_will_be_used(&target.request, cached)
            .await?;
        match &response {
            Some(_) => debug!(cache = %target.cache_name, key = %key, "cache hit"),
            None => debug!(cache = %target.cache_name, key = %key, "cache hit vetoed by plugin"),
        }
        Ok(response)
    }

    /// Writes `response` under a resolved target.
    ///
    /// A veto from `cache_will_update` skips the write without error.
    /// `cache_did_update` observers fire after the write with the replaced
    /// entry, if there was one.
    pub async fn store(
        &self,
        target: &CacheTarget,
        response: Response,
        plugins: &PluginChain,
    ) -> Result<(), Error> {
        let key = target.key();
        let Some(response) = plugins.cache_will_update(&target.request, response).await? else {
            debug!(cache = %target.cache_name, key = %key, "cache write vetoed by plugin");
            return Ok(());
        };

        if !plugins.implements(Hook::CacheDidUpdate) {
            self.storage.set(&target.cache_name, key, response).await?;
            debug!(cache = %target.cache_name, "cache updated");
            return Ok(());
        }

        let old_response = self.storage.get(&target.cache_name, &key).await?;
        let snapshot = response.duplicate();
        self.storage.set(&target.cache_name, key, response).await?;
        debug!(cache = %target.cache_name, "cache updated");

        plugins
            .cache_did_update(
                &target.cache_name,
                &target.request,
                old_response.as_ref(),
                &snapshot,
            )
            .await;
        Ok(())
    }

    /// Resolves the key for `request` and looks it up in `cache_name`.
    pub async fn match_response(
        &self,
        cache_name: &str,
        request: &Request,
        plugins: &PluginChain,
    ) -> Result<Option<Response>, Error> {
        let target = self.resolve(cache_name, request, plugins).await?;
        self.lookup(&target, plugins).await
    }

    /// Resolves the key for `request` and writes `response` under it.
    pub async fn put(
        &self,
        cache_name: &str,
        request: &Request,
        response: Response,
        plugins: &PluginChain,
    ) -> Result<(), Error> {
        let target = self.resolve(cache_name, request, plugins).await?;
        self.store(&target, response, plugins).await
    }

    /// Resolves the key for `request` and removes its entry. Returns `true` if one existed.
    pub async fn delete(
        &self,
        cache_name: &str,
        request: &Request,
        plugins: &PluginChain,
    ) -> Result<bool, Error> {
        let target = self.resolve(cache_name, request, plugins).await?;
        let removed = self.storage.delete(&target.cache_name, &target.key()).await?;
        Ok(removed)
    }
}
