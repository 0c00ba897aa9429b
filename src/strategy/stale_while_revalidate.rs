//! Stale-while-revalidate: serve the cached copy, refresh it in the background.

use tokio::sync::oneshot;
use tracing::debug;

use super::{Strategy, StrategyCore};
use crate::BoxFuture;
use crate::background::BackgroundTasks;
use crate::config::StrategyOptions;
use crate::context::CacheContext;
use crate::error::{Error, NoResponseError, StrategyError};
use crate::http::{Request, Response};
use crate::plugin::{Hook, Plugin, cache_ok_and_opaque};

const NAME: &str = "StaleWhileRevalidate";

/// Serves the cached copy immediately and refreshes it from the network in
/// the background.
///
/// The revalidating fetch starts before the cache lookup and is registered as
/// a background task right away, so a cache hit never waits on the network.
/// On a miss the caller waits for that same fetch.
///
/// Unless a configured plugin fills `cache_will_update`,
/// [`cache_ok_and_opaque`] is installed so that only `2xx` and opaque
/// responses are stored.
pub struct StaleWhileRevalidate {
    core: StrategyCore,
}

impl StaleWhileRevalidate {
    pub fn new(context: &CacheContext) -> Self {
        Self::with_options(context, StrategyOptions::default())
    }

    pub fn with_options(context: &CacheContext, options: StrategyOptions) -> Self {
        Self {
            core: StrategyCore::new(context, &options)
                .with_fallback(Hook::CacheWillUpdate, cache_ok_and_opaque),
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

        let (tx, rx) = oneshot::channel::<Result<Response, Error>>();
        {
            let cache = core.cache.clone();
            let network = core.network.clone();
            let plugins = core.plugins.clone();
            let target = target.clone();
            let request = request.clone();
            tasks.register(format!("{NAME}: revalidate {}", request.url()), async move {
                match network.fetch(&request, &plugins).await {
                    Ok(response) => {
                        let copy = response.duplicate();
                        let _ = tx.send(Ok(response));
                        cache.store(&target, copy, &plugins).await
                    }
                    Err(error) => {
                        let _ = tx.send(Err(error.clone()));
                        Err(error)
                    }
                }
            });
        }

        if let Some(cached) = core.cache.lookup(&target, &core.plugins).await? {
            debug!(strategy = NAME, url = request.url(), "responding from cache, revalidating");
            return Ok(cached);
        }

        debug!(strategy = NAME, url = request.url(), "cache miss, waiting for network");
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(NoResponseError {
                url: request.url().to_owned(),
                network: None,
            }
            .into()),
        }
    }
}

impl Strategy for StaleWhileRevalidate {
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::{CacheKey, MemoryCacheStorage};
    use crate::error::TransportError;
    use crate::http::StatusCode;
    use crate::network::transport_fn;

    fn context_returning(status: StatusCode) -> (Arc<MemoryCacheStorage>, CacheContext) {
        let storage = Arc::new(MemoryCacheStorage::new());
        let ctx = CacheContext::new(
            storage.clone(),
            transport_fn(move |_req| async move { Ok(Response::new(status).body("net")) }),
        );
        (storage, ctx)
    }

    #[test]
    fn default_policy_installed_only_without_cache_will_update() {
        let (_, ctx) = context_returning(StatusCode::OK);
        let plain = StaleWhileRevalidate::new(&ctx);
        assert_eq!(plain.core.plugins.len(), 1);

        let custom = StaleWhileRevalidate::new(&ctx).plugin(
            Plugin::new("keep-everything").on_cache_will_update(|_r, res| async move { Ok(Some(res)) }),
        );
        let names: Vec<_> = custom.core.plugins.iter().map(Plugin::name).collect();
        assert_eq!(names, vec!["keep-everything"]);
    }

    #[tokio::test]
    async fn miss_waits_for_network_and_caches_success() {
        let (storage, ctx) = context_returning(StatusCode::OK);
        let tasks = BackgroundTasks::new();
        let res = StaleWhileRevalidate::new(&ctx)
            .cache_name("c")
            .handle(Request::get("/x"), &tasks)
            .await
            .unwrap();
        assert_eq!(res.text().unwrap(), "net");

        assert!(tasks.settle().await.is_clean());
        assert!(storage.peek("c", &CacheKey::from(&Request::get("/x"))).is_some());
    }

    #[tokio::test]
    async fn default_policy_refuses_error_responses() {
        let (storage, ctx) = context_returning(StatusCode::INTERNAL_SERVER_ERROR);
        let tasks = BackgroundTasks::new();
        let res = StaleWhileRevalidate::new(&ctx)
            .cache_name("c")
            .handle(Request::get("/x"), &tasks)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        tasks.settle().await;
        assert!(storage.is_empty("c"));
    }

    #[tokio::test]
    async fn hit_with_failing_network_reports_in_background_only() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let ctx = CacheContext::new(
            storage.clone(),
            transport_fn(|_req| async { Err(TransportError::Aborted) }),
        );
        ctx.cache_access()
            .put(
                "c",
                &Request::get("/x"),
                Response::new(StatusCode::OK).body("old"),
                &Default::default(),
            )
            .await
            .unwrap();

        let tasks = BackgroundTasks::new();
        let res = StaleWhileRevalidate::new(&ctx)
            .cache_name("c")
            .handle(Request::get("/x"), &tasks)
            .await
            .unwrap();
        assert_eq!(res.text().unwrap(), "old");

        let report = tasks.settle().await;
        assert_eq!(report.failures.len(), 1);
    }

    #[tokio::test]
    async fn miss_with_failing_network_errors() {
        let ctx = CacheContext::new(
            Arc::new(MemoryCacheStorage::new()),
            transport_fn(|_req| async { Err(TransportError::Aborted) }),
        );
        let err = StaleWhileRevalidate::new(&ctx)
            .handle(Request::get("/x"), &BackgroundTasks::new())
            .await
            .unwrap_err();
        assert!(err.is_network());
    }
}
