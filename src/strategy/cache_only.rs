//! Cache-only strategy.

use tracing::debug;

use super::{Strategy, StrategyCore};
use crate::BoxFuture;
use crate::background::BackgroundTasks;
use crate::config::StrategyOptions;
use crate::context::CacheContext;
use crate::error::{Error, NoResponseError, StrategyError};
use crate::http::{Request, Response};
use crate::plugin::Plugin;

const NAME: &str = "CacheOnly";

/// Serves exclusively from the cache. A miss is a [`NoResponseError`].
pub struct CacheOnly {
    core: StrategyCore,
}

impl CacheOnly {
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

    async fn respond(&self, request: Request) -> Result<Response, Error> {
        let core = &self.core;
        let cached = core
            .cache
            .match_response(&core.cache_name, &request, &core.plugins)
            .await?;
        match cached {
            Some(response) => {
                debug!(strategy = NAME, url = request.url(), "responding from cache");
                Ok(response)
            }
            None => Err(NoResponseError {
                url: request.url().to_owned(),
                network: None,
            }
            .into()),
        }
    }
}

impl Strategy for CacheOnly {
    fn name(&self) -> &'static str {
        NAME
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        _tasks: &'a BackgroundTasks,
    ) -> BoxFuture<'a, Result<Response, StrategyError>> {
        Box::pin(async move {
            self.respond(request)
                .await
                .map_err(|e| StrategyError::new(NAME, e))
        })
    }
}
