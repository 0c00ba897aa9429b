//! Caching strategies: policies mapping a request to a response.
//!
//! | Strategy                 | Reads cache | Hits network                | Writes cache        |
//! |--------------------------|-------------|-----------------------------|---------------------|
//! | [`CacheOnly`]            | yes         | never                       | never               |
//! | [`NetworkOnly`]          | never       | always                      | never               |
//! | [`CacheFirst`]           | first       | on miss                     | after network hit   |
//! | [`NetworkFirst`]         | on failure  | first                       | after network hit   |
//! | [`StaleWhileRevalidate`] | yes         | always, in the background   | after network hit   |
//!
//! A strategy instance is immutable once built and may serve any number of
//! concurrent requests. All per-request state lives in the `handle` future;
//! work that outlives the response is registered with the caller's
//! [`BackgroundTasks`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use rtcache::background::BackgroundTasks;
//! use rtcache::cache::MemoryCacheStorage;
//! use rtcache::context::CacheContext;
//! use rtcache::http::{Request, Response, StatusCode};
//! use rtcache::network::transport_fn;
//! use rtcache::strategy::{CacheFirst, Strategy};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let context = CacheContext::new(
//!     Arc::new(MemoryCacheStorage::new()),
//!     transport_fn(|_req| async { Ok(Response::new(StatusCode::OK).body("hello")) }),
//! );
//! let strategy = CacheFirst::new(&context).cache_name("pages");
//!
//! let tasks = BackgroundTasks::new();
//! let response = strategy.handle(Request::get("/x"), &tasks).await.unwrap();
//! assert_eq!(response.text().unwrap(), "hello");
//!
//! // The cache write finishes after the response was handed back.
//! assert!(tasks.settle().await.is_clean());
//! let again = strategy.handle(Request::get("/x"), &tasks).await.unwrap();
//! assert!(again.is_from_cache());
//! # }
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::BoxFuture;
use crate::background::BackgroundTasks;
use crate::cache::CacheAccess;
use crate::cache::access::CacheTarget;
use crate::config::StrategyOptions;
use crate::context::CacheContext;
use crate::error::{Error, StrategyError};
use crate::http::{Request, Response};
use crate::network::NetworkAccess;
use crate::plugin::{Hook, Plugin, PluginChain};

mod cache_first;
mod cache_only;
mod network_first;
mod network_only;
mod stale_while_revalidate;

pub use cache_first::CacheFirst;
pub use cache_only::CacheOnly;
pub use network_first::NetworkFirst;
pub use network_only::NetworkOnly;
pub use stale_while_revalidate::StaleWhileRevalidate;

/// A request-handling policy.
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// request routed to it.
pub trait Strategy: Send + Sync {
    /// Human-readable strategy name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Produces a response for `request`.
    ///
    /// Work that must finish after the response is returned (cache population,
    /// revalidation) is registered with `tasks`; the caller is responsible for
    /// settling it.
    fn handle<'a>(
        &'a self,
        request: Request,
        tasks: &'a BackgroundTasks,
    ) -> BoxFuture<'a, Result<Response, StrategyError>>;
}

/// Strategy selector for configuration-driven setups.
///
/// # Examples
///
/// ```
/// use rtcache::strategy::StrategyKind;
///
/// let kind: StrategyKind = serde_json::from_str(r#""stale_while_revalidate""#).unwrap();
/// assert_eq!(kind, StrategyKind::StaleWhileRevalidate);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    CacheFirst,
    CacheOnly,
    NetworkFirst,
    NetworkOnly,
    StaleWhileRevalidate,
}

impl StrategyKind {
    /// Builds the selected strategy with the given options and plugins.
    pub fn build(
        self,
        context: &CacheContext,
        options: StrategyOptions,
        plugins: Vec<Plugin>,
    ) -> Arc<dyn Strategy> {
        match self {
            Self::CacheFirst => Arc::new(CacheFirst::with_options(context, options).plugins(plugins)),
            Self::CacheOnly => Arc::new(CacheOnly::with_options(context, options).plugins(plugins)),
            Self::NetworkFirst => {
                Arc::new(NetworkFirst::with_options(context, options).plugins(plugins))
            }
            Self::NetworkOnly => {
                Arc::new(NetworkOnly::with_options(context, options).plugins(plugins))
            }
            Self::StaleWhileRevalidate => {
                Arc::new(StaleWhileRevalidate::with_options(context, options).plugins(plugins))
            }
        }
    }
}

/// Configuration shared by every strategy: the facades, the target cache and
/// the resolved plugin chain.
#[derive(Clone)]
pub(crate) struct StrategyCore {
    pub(crate) cache: CacheAccess,
    pub(crate) network: NetworkAccess,
    pub(crate) cache_name: String,
    declared: Vec<Plugin>,
    pub(crate) plugins: PluginChain,
    fallback: Option<(Hook, fn() -> Plugin)>,
}

impl StrategyCore {
    pub(crate) fn new(context: &CacheContext, options: &StrategyOptions) -> Self {
        Self {
            cache: context.cache_access(),
            network: context.network_access(),
            cache_name: context
                .cache_names()
                .resolve(options.cache_name.as_deref()),
            declared: Vec::new(),
            plugins: PluginChain::default(),
            fallback: None,
        }
    }

    /// Installs `make()` ahead of the declared plugins whenever none of them
    /// fills `hook`.
    pub(crate) fn with_fallback(mut self, hook: Hook, make: fn() -> Plugin) -> Self {
        self.fallback = Some((hook, make));
        self.resolve_plugins();
        self
    }

    pub(crate) fn set_cache_name(&mut self, cache_name: String) {
        self.cache_name = cache_name;
    }

    pub(crate) fn add_plugins(&mut self, plugins: impl IntoIterator<Item = Plugin>) {
        self.declared.extend(plugins);
        self.resolve_plugins();
    }

    fn resolve_plugins(&mut self) {
        self.plugins = match self.fallback {
            Some((hook, make)) => PluginChain::with_fallback(self.declared.clone(), hook, make()),
            None => PluginChain::new(self.declared.clone()),
        };
    }

    pub(crate) async fn resolve(&self, request: &Request) -> Result<CacheTarget, Error> {
        self.cache.resolve(&self.cache_name, request, &self.plugins).await
    }

    /// Registers a background write of `response` under `target`.
    ///
    /// `response` must already be a duplicate: the caller keeps the original.
    pub(crate) fn populate(
        &self,
        strategy: &'static str,
        tasks: &BackgroundTasks,
        target: CacheTarget,
        response: Response,
    ) {
        let cache = self.cache.clone();
        let plugins = self.plugins.clone();
        let label = format!("{strategy}: cache {}", target.request().url());
        debug!(strategy, url = target.request().url(), "scheduling cache update");
        tasks.register(label, async move { cache.store(&target, response, &plugins).await });
    }

    /// Registers a background write of `response` for a request whose cache
    /// key has not been resolved yet. Key rewriting happens inside the task,
    /// so a failing `cache_key_will_be_used` hook is reported by the registrar.
    pub(crate) fn populate_request(
        &self,
        strategy: &'static str,
        tasks: &BackgroundTasks,
        request: Request,
        response: Response,
    ) {
        let cache = self.cache.clone();
        let plugins = self.plugins.clone();
        let cache_name = self.cache_name.clone();
        let label = format!("{strategy}: cache {}", request.url());
        debug!(strategy, url = request.url(), "scheduling cache update");
        tasks.register(label, async move {
            cache.put(&cache_name, &request, response, &plugins).await
        });
    }
}
