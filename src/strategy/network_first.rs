//! Network-first strategy, with an optional timeout before falling back to the cache.

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use super::{Strategy, StrategyCore};
use crate::BoxFuture;
use crate::background::BackgroundTasks;
use crate::config::StrategyOptions;
use crate::context::CacheContext;
use crate::error::{Error, NetworkError, NoResponseError, StrategyError};
use crate::http::{Request, Response};
use crate::plugin::Plugin;

const NAME: &str = "NetworkFirst";

type NetworkResult = Result<Response, Error>;

/// Fetches from the network and populates the cache; falls back to the cache
/// when the network fails.
///
/// The network is always tried before any cache hook runs. The cache key is
/// resolved only where a cache operation happens: inside the background write
/// after a successful fetch, or in the fallback lookup. A failing
/// `cache_key_will_be_used` plugin therefore never keeps a healthy network
/// response from the caller; it shows up in the [`SettleReport`] instead.
///
/// With a [network timeout](Self::network_timeout), a slow network also falls
/// back to the cache. The fetch keeps running in the background and still
/// updates the cache when it eventually lands.
///
/// [`SettleReport`]: crate::background::SettleReport
pub struct NetworkFirst {
    core: StrategyCore,
    network_timeout: Option<Duration>,
}

impl NetworkFirst {
    pub fn new(context: &CacheContext) -> Self {
        Self::with_options(context, StrategyOptions::default())
    }

    pub fn with_options(context: &CacheContext, options: StrategyOptions) -> Self {
        Self {
            core: StrategyCore::new(context, &options),
            network_timeout: options.network_timeout(),
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

    /// Consults the cache if the network has not answered within `timeout`.
    #[must_use]
    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    async fn respond(&self, request: Request, tasks: &BackgroundTasks) -> Result<Response, Error> {
        if let Some(timeout) = self.network_timeout {
            return self.respond_with_timeout(request, tasks, timeout).await;
        }

        match self.core.network.fetch(&request, &self.core.plugins).await {
            Ok(response) => {
                self.core
                    .populate_request(NAME, tasks, request.clone(), response.duplicate());
                debug!(strategy = NAME, url = request.url(), "responding from network");
                Ok(response)
            }
            Err(Error::Network(error)) => self.from_cache(&request, Some(error)).await,
            Err(other) => Err(other),
        }
    }

    async fn respond_with_timeout(
        &self,
        request: Request,
        tasks: &BackgroundTasks,
        timeout: Duration,
    ) -> Result<Response, Error> {
        let mut network = self.spawn_fetch(request.clone(), tasks);

        let settled = match tokio::time::timeout(timeout, &mut network).await {
            Ok(settled) => settled,
            Err(_) => {
                debug!(strategy = NAME, ?timeout, "network timed out, trying cache");
                let cached = self
                    .core
                    .cache
                    .match_response(&self.core.cache_name, &request, &self.core.plugins)
                    .await?;
                if let Some(cached) = cached {
                    return Ok(cached);
                }
                network.await
            }
        };

        match settled {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(Error::Network(error))) => self.from_cache(&request, Some(error)).await,
            Ok(Err(other)) => Err(other),
            // The fetch task died without reporting.
            Err(_) => self.from_cache(&request, None).await,
        }
    }

    /// Registers fetch-then-populate as one background task and returns a
    /// receiver for the network outcome.
    fn spawn_fetch(&self, request: Request, tasks: &BackgroundTasks) -> oneshot::Receiver<NetworkResult> {
        let (tx, rx) = oneshot::channel();
        let cache = self.core.cache.clone();
        let network = self.core.network.clone();
        let plugins = self.core.plugins.clone();
        let cache_name = self.core.cache_name.clone();
        let label = format!("{NAME}: fetch {}", request.url());

        tasks.register(label, async move {
            match network.fetch(&request, &plugins).await {
                Ok(response) => {
                    let copy = response.duplicate();
                    let _ = tx.send(Ok(response));
                    cache.put(&cache_name, &request, copy, &plugins).await
                }
                Err(error) => {
                    let _ = tx.send(Err(error.clone()));
                    Err(error)
                }
            }
        });
        rx
    }

    async fn from_cache(
        &self,
        request: &Request,
        network: Option<NetworkError>,
    ) -> Result<Response, Error> {
        let cached = self
            .core
            .cache
            .match_response(&self.core.cache_name, request, &self.core.plugins)
            .await?;
        match cached {
            Some(cached) => {
                debug!(strategy = NAME, url = request.url(), "network unavailable, responding from cache");
                Ok(cached)
            }
            None => Err(NoResponseError {
                url: request.url().to_owned(),
                network,
            }
            .into()),
        }
    }
}

impl Strategy for NetworkFirst {
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
    use std::error::Error as _;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::background::TaskFailure;
    use crate::cache::{CacheKey, MemoryCacheStorage};
    use crate::error::TransportError;
    use crate::http::StatusCode;
    use crate::network::transport_fn;
    use crate::plugin::PluginChain;

    async fn seeded(ctx: &CacheContext, url: &str, body: &str) {
        ctx.cache_access()
            .put(
                "c",
                &Request::get(url),
                Response::new(StatusCode::OK).body(body.to_owned()),
                &PluginChain::default(),
            )
            .await
            .unwrap();
    }

    fn offline_context() -> CacheContext {
        CacheContext::new(
            Arc::new(MemoryCacheStorage::new()),
            transport_fn(|_req| async { Err(TransportError::Unreachable("offline".into())) }),
        )
    }

    #[tokio::test]
    async fn online_returns_network_and_updates_cache() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let ctx = CacheContext::new(
            storage.clone(),
            transport_fn(|_req| async { Ok(Response::new(StatusCode::OK).body("fresh")) }),
        );
        seeded(&ctx, "/x", "stale").await;

        let tasks = BackgroundTasks::new();
        let res = NetworkFirst::new(&ctx)
            .cache_name("c")
            .handle(Request::get("/x"), &tasks)
            .await
            .unwrap();
        assert_eq!(res.text().unwrap(), "fresh");

        tasks.settle().await;
        let stored = storage.peek("c", &CacheKey::from(&Request::get("/x"))).unwrap();
        assert_eq!(stored.text().unwrap(), "fresh");
    }

    #[tokio::test]
    async fn offline_falls_back_to_cache() {
        let ctx = offline_context();
        seeded(&ctx, "/x", "cached").await;

        let res = NetworkFirst::new(&ctx)
            .cache_name("c")
            .handle(Request::get("/x"), &BackgroundTasks::new())
            .await
            .unwrap();
        assert!(res.is_from_cache());
        assert_eq!(res.text().unwrap(), "cached");
    }

    #[tokio::test]
    async fn offline_and_empty_is_no_response_wrapping_network_error() {
        let err = NetworkFirst::new(&offline_context())
            .cache_name("c")
            .handle(Request::get("/x"), &BackgroundTasks::new())
            .await
            .unwrap_err();
        assert!(err.is_no_response());

        let Error::NoResponse(no_response) = err.kind() else {
            panic!("expected NoResponse, got {err:?}");
        };
        assert!(no_response.network.is_some());
        assert!(no_response.source().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_network_serves_cache_then_still_updates() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let ctx = CacheContext::new(
            storage.clone(),
            transport_fn(|_req| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Response::new(StatusCode::OK).body("late"))
            }),
        );
        seeded(&ctx, "/x", "cached").await;

        let tasks = BackgroundTasks::new();
        let strategy = NetworkFirst::new(&ctx)
            .cache_name("c")
            .network_timeout(Duration::from_secs(3));
        let res = strategy.handle(Request::get("/x"), &tasks).await.unwrap();
        assert_eq!(res.text().unwrap(), "cached");

        assert!(tasks.settle().await.is_clean());
        let stored = storage.peek("c", &CacheKey::from(&Request::get("/x"))).unwrap();
        assert_eq!(stored.text().unwrap(), "late");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_network_with_empty_cache_waits_for_network() {
        let ctx = CacheContext::new(
            Arc::new(MemoryCacheStorage::new()),
            transport_fn(|_req| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Response::new(StatusCode::OK).body("late"))
            }),
        );
        let strategy = NetworkFirst::with_options(
            &ctx,
            StrategyOptions {
                cache_name: Some("c".into()),
                network_timeout_seconds: Some(1),
            },
        );
        let res = strategy
            .handle(Request::get("/x"), &BackgroundTasks::new())
            .await
            .unwrap();
        assert_eq!(res.text().unwrap(), "late");
    }

    fn counting_online_context(
        storage: Arc<MemoryCacheStorage>,
        calls: Arc<AtomicUsize>,
    ) -> CacheContext {
        CacheContext::new(
            storage,
            transport_fn(move |_req| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(Response::new(StatusCode::OK).body("fresh")) }
            }),
        )
    }

    fn broken_key_plugin() -> Plugin {
        Plugin::new("broken-key")
            .on_cache_key_will_be_used(|_req| async { Err("key store down".into()) })
    }

    #[tokio::test]
    async fn failing_key_hook_does_not_block_healthy_network() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = counting_online_context(storage.clone(), Arc::clone(&calls));

        let tasks = BackgroundTasks::new();
        let res = NetworkFirst::new(&ctx)
            .cache_name("c")
            .plugin(broken_key_plugin())
            .handle(Request::get("/x"), &tasks)
            .await
            .unwrap();
        assert_eq!(res.text().unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let report = tasks.settle().await;
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            TaskFailure::Failed {
                error: Error::Plugin(_),
                ..
            }
        ));
        assert!(storage.is_empty("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_key_hook_with_timeout_still_returns_network() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = counting_online_context(storage.clone(), Arc::clone(&calls));

        let tasks = BackgroundTasks::new();
        let res = NetworkFirst::new(&ctx)
            .cache_name("c")
            .network_timeout(Duration::from_secs(3))
            .plugin(broken_key_plugin())
            .handle(Request::get("/x"), &tasks)
            .await
            .unwrap();
        assert_eq!(res.text().unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let report = tasks.settle().await;
        assert_eq!(report.failures.len(), 1);
        assert!(storage.is_empty("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_path_falls_back_to_cache_on_early_network_failure() {
        let ctx = offline_context();
        seeded(&ctx, "/x", "cached").await;

        let tasks = BackgroundTasks::new();
        let res = NetworkFirst::new(&ctx)
            .cache_name("c")
            .network_timeout(Duration::from_secs(3))
            .handle(Request::get("/x"), &tasks)
            .await
            .unwrap();
        assert!(res.is_from_cache());
        assert_eq!(res.text().unwrap(), "cached");

        let report = tasks.settle().await;
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            TaskFailure::Failed {
                error: Error::Network(_),
                ..
            }
        ));
    }
}
