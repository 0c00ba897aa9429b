//! Cache-first strategy: answer from the cache, fetch and populate on a miss.

use tracing::debug;

use super::{Strategy, StrategyCore};
use crate::BoxFuture;
use crate::background::BackgroundTasks;
use crate::config::StrategyOptions;
use crate::context::CacheContext;
use crate::error::{Error, StrategyError};
use crate::http::{Request, Response};
use crate::plugin::Plugin;

const NAME: &str = "CacheFirst";

/// Serves from the cache; on a miss, fetches and populates the cache in the background.
///
/// Suited to revisioned assets that never change under the same URL. A network
/// failure on a miss is returned as-is.
pub struct CacheFirst {
    core: StrategyCore,
}

impl CacheFirst {
    pub fn new(context: &CacheContext) -> Self {
        Self::with_options(context, StrategyOptions::default())
    }

    pub fn with_options(context: &CacheContext, options: StrategyOptions) -> Self {
        Self {
            core: StrategyCore::new(context, &options),
        }
    }

    #[must_use]
    pub fn cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.core.set_cache_name(cache_name.into());
        self
    }

    #[must_use]
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.core.add_plugins([plugin]);
        self
    }

    #[must_use]
    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Plugin>) -> Self {
        self.core.add_plugins(plugins);
        self
    }

    async fn respond(&self, request: Request, tasks: &BackgroundTasks) -> Result<Response, Error> {
        let core = &self.core;
        let target = core.resolve(&request).await?;

        if let Some(cached) = core.cache.lookup(&target, &core.plugins).await? {
            debug!(strategy = NAME, url = request.url(), "responding from cache");
            return Ok(cached);
        }

        let response = core.network.fetch(&request, &core.plugins).await?;
        core.populate(NAME, tasks, target, response.duplicate());
        debug!(strategy = NAME, url = request.url(), "responding from network");
        Ok(response)
    }
}

impl Strategy for CacheFirst {
    fn name(&self) -> &'static str {
        NAME
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        tasks: &'a BackgroundTasks,
    ) -> BoxFuture<'a, Result<Response, StrategyError>> {
        Box::pin(async move {
            self.respond(request, tasks)
                .await
                .map_err(|e| StrategyError::new(NAME, e))
        })
    }
}
