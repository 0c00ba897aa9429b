//! Ordered execution of plugin hooks.
//!
//! The chain runs a hook on every plugin that fills the slot, in declaration
//! order, feeding each output into the next plugin's input:
//!
//! - **transform** hooks propagate the first error as a [`PluginError`];
//! - **veto** hooks stop at the first `None`, which becomes the chain's result;
//! - **observer** hooks run on every plugin, and their errors are logged and
//!   swallowed so they never affect the request path.

use std::sync::Arc;

use tracing::warn;

use super::{CacheUpdate, Hook, Plugin};
use crate::error::{NetworkError, PluginError};
use crate::http::{Request, Response};

/// An immutable, cheaply clonable, ordered sequence of plugins.
#[derive(Debug, Clone, Default)]
pub struct PluginChain {
    plugins: Arc<[Plugin]>,
}

impl PluginChain {
    pub fn new(plugins: impl IntoIterator<Item = Plugin>) -> Self {
        Self {
            plugins: plugins.into_iter().collect(),
        }
    }

    /// Builds a chain from `plugins`, prepending `fallback` when none of them
    /// fills `hook`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rtcache::plugin::{Hook, Plugin, PluginChain, cache_ok_and_opaque};
    ///
    /// let chain = PluginChain::with_fallback(vec![], Hook::CacheWillUpdate, cache_ok_and_opaque());
    /// assert_eq!(chain.len(), 1);
    ///
    /// let custom = Plugin::new("keep-all").on_cache_will_update(|_req, res| async move { Ok(Some(res)) });
    /// let chain = PluginChain::with_fallback(vec![custom], Hook::CacheWillUpdate, cache_ok_and_opaque());
    /// assert_eq!(chain.iter().map(|p| p.name()).collect::<Vec<_>>(), vec!["keep-all"]);
    /// ```
    pub fn with_fallback(plugins: Vec<Plugin>, hook: Hook, fallback: Plugin) -> Self {
        if plugins.iter().any(|p| p.implements(hook)) {
            Self::new(plugins)
        } else {
            Self::new(std::iter::once(fallback).chain(plugins))
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    /// Returns `true` if any plugin in the chain fills `hook`.
    pub fn implements(&self, hook: Hook) -> bool {
        self.plugins.iter().any(|p| p.implements(hook))
    }

    pub async fn cache_key_will_be_used(&self, mut request: Request) -> Result<Request, PluginError> {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.cache_key_will_be_used {
                request = hook(request)
                    .await
                    .map_err(|e| PluginError::new(plugin.name(), Hook::CacheKeyWillBeUsed, e))?;
            }
        }
        Ok(request)
    }

    pub async fn request_will_fetch(&self, mut request: Request) -> Result<Request, PluginError> {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.request_will_fetch {
                request = hook(request)
                    .await
                    .map_err(|e| PluginError::new(plugin.name(), Hook::RequestWillFetch, e))?;
            }
        }
        Ok(request)
    }

    pub async fn fetch_did_succeed(
        &self,
        request: &Request,
        mut response: Response,
    ) -> Result<Response, PluginError> {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.fetch_did_succeed {
                response = hook(request.clone(), response)
                    .await
                    .map_err(|e| PluginError::new(plugin.name(), Hook::FetchDidSucceed, e))?;
            }
        }
        Ok(response)
    }

    /// Returns `Ok(None)` as soon as one plugin vetoes the write.
    pub async fn cache_will_update(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Option<Response>, PluginError> {
        let mut current = response;
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.cache_will_update {
                match hook(request.clone(), current)
                    .await
                    .map_err(|e| PluginError::new(plugin.name(), Hook::CacheWillUpdate, e))?
                {
                    Some(next) => current = next,
                    None => return Ok(None),
                }
            }
        }
        Ok(Some(current))
    }

    /// Returns `Ok(None)` as soon as one plugin vetoes the cached entry.
    pub async fn cached_response_will_be_used(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Option<Response>, PluginError> {
        let mut current = response;
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.cached_response_will_be_used {
                match hook(request.clone(), current).await.map_err(|e| {
                    PluginError::new(plugin.name(), Hook::CachedResponseWillBeUsed, e)
                })? {
                    Some(next) => current = next,
                    None => return Ok(None),
                }
            }
        }
        Ok(Some(current))
    }

    pub async fn fetch_did_fail(&self, request: &Request, error: &NetworkError) {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.fetch_did_fail {
                if let Err(e) = hook(request.clone(), error.clone()).await {
                    warn!(
                        plugin = plugin.name(),
                        hook = %Hook::FetchDidFail,
                        error = %e,
                        "observer hook failed"
                    );
                }
            }
        }
    }

    pub async fn cache_did_update(
        &self,
        cache_name: &str,
        request: &Request,
        old_response: Option<&Response>,
        new_response: &Response,
    ) {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.cache_did_update {
                let update = CacheUpdate {
                    cache_name: cache_name.to_owned(),
                    request: request.clone(),
                    old_response: old_response.map(Response::duplicate),
                    new_response: new_response.duplicate(),
                };
                if let Err(e) = hook(update).await {
                    warn!(
                        plugin = plugin.name(),
                        hook = %Hook::CacheDidUpdate,
                        cache = cache_name,
                        error = %e,
                        "observer hook failed"
                    );
                }
            }
        }
    }
}

impl From<Vec<Plugin>> for PluginChain {
    fn from(plugins: Vec<Plugin>) -> Self {
        Self::new(plugins)
    }
}
