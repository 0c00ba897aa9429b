//! Network-only strategy.

use tracing::debug;

use super::{Strategy, StrategyCore};
use crate::BoxFuture;
use crate::background::BackgroundTasks;
use crate::config::StrategyOptions;
use crate::context::CacheContext;
use crate::error::StrategyError;
use crate::http::{Request, Response};
use crate::plugin::Plugin;

const NAME: &str = "NetworkOnly";

/// Always fetches from the network; never reads or writes the cache.
pub struct NetworkOnly {
    core: StrategyCore,
}

impl NetworkOnly {
    pub fn new(context: &CacheContext) -> Self {
        Self::with_options(context, StrategyOptions::default())
    }

    pub fn with_options(context: &CacheContext, options: StrategyOptions) -> Self {
        Self {
            core: StrategyCore::new(context, &options),
        }
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
}

impl Strategy for NetworkOnly {
    fn name(&self) -> &'static str {
        NAME
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        _tasks: &'a BackgroundTasks,
    ) -> BoxFuture<'a, Result<Response, StrategyError>> {
        Box::pin(async move {
            debug!(strategy = NAME, url = request.url(), "fetching");
            self.core
                .network
                .fetch(&request, &self.core.plugins)
                .await
                .map_err(|e| StrategyError::new(NAME, e))
        })
    }
}
