//! Plugins: ordered sets of optional lifecycle callbacks.
//!
//! A [`Plugin`] is a named bag of hook slots. Each slot is independently
//! present or absent; an absent slot is a passthrough. Plugins are assembled
//! into a [`PluginChain`] in declaration order, and the cache and network
//! facades drive that chain at well-defined points:
//!
//! | Hook                           | Kind        | Runs around                       |
//! |--------------------------------|-------------|-----------------------------------|
//! | `cache_key_will_be_used`       | transform   | every cache read and write        |
//! | `cached_response_will_be_used` | veto        | a cache hit, before it is returned |
//! | `cache_will_update`            | veto        | a cache write, before storing     |
//! | `cache_did_update`             | observer    | a completed cache write           |
//! | `request_will_fetch`           | transform   | a network dispatch                |
//! | `fetch_did_succeed`            | transform   | a network response                |
//! | `fetch_did_fail`               | observer    | a network failure                 |
//!
//! # Examples
//!
//! ```
//! use rtcache::plugin::{Hook, Plugin};
//!
//! let strip_query = Plugin::new("strip-query")
//!     .on_cache_key_will_be_used(|request| async move { Ok(request.without_query()) });
//!
//! assert!(strip_query.implements(Hook::CacheKeyWillBeUsed));
//! assert!(!strip_query.implements(Hook::CacheWillUpdate));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::BoxFuture;
use crate::error::{BoxError, NetworkError};
use crate::http::{Request, Response};

pub mod builtin;
pub mod pipeline;

pub use builtin::{CacheableResponse, cache_ok_and_opaque};
pub use pipeline::PluginChain;

/// Identifies one plugin callback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    CacheKeyWillBeUsed,
    RequestWillFetch,
    FetchDidFail,
    FetchDidSucceed,
    CacheWillUpdate,
    CacheDidUpdate,
    CachedResponseWillBeUsed,
}

impl Hook {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheKeyWillBeUsed => "cache_key_will_be_used",
            Self::RequestWillFetch => "request_will_fetch",
            Self::FetchDidFail => "fetch_did_fail",
            Self::FetchDidSucceed => "fetch_did_succeed",
            Self::CacheWillUpdate => "cache_will_update",
            Self::CacheDidUpdate => "cache_did_update",
            Self::CachedResponseWillBeUsed => "cached_response_will_be_used",
        }
    }

    /// Observer hooks run unconditionally and cannot fail the primary operation.
    pub fn is_observer(self) -> bool {
        matches!(self, Self::FetchDidFail | Self::CacheDidUpdate)
    }

    /// Veto hooks may return `None` to stop the chain and skip the guarded operation.
    pub fn is_veto(self) -> bool {
        matches!(self, Self::CacheWillUpdate | Self::CachedResponseWillBeUsed)
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot handed to `cache_did_update` observers after a write lands.
#[derive(Debug)]
pub struct CacheUpdate {
    pub cache_name: String,
    /// The request under its rewritten cache key.
    pub request: Request,
    /// The entry that was replaced, if any.
    pub old_response: Option<Response>,
    pub new_response: Response,
}

type RequestHook =
    Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Request, BoxError>> + Send + Sync>;
type ResponseHook =
    Arc<dyn Fn(Request, Response) -> BoxFuture<'static, Result<Response, BoxError>> + Send + Sync>;
type VetoHook = Arc<
    dyn Fn(Request, Response) -> BoxFuture<'static, Result<Option<Response>, BoxError>>
        + Send
        + Sync,
>;
type FetchFailedHook =
    Arc<dyn Fn(Request, NetworkError) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;
type CacheUpdatedHook =
    Arc<dyn Fn(CacheUpdate) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// A named set of optional lifecycle callbacks.
///
/// Construct with [`Plugin::new`] and fill slots with the `on_*` builder
/// methods. Cloning is cheap: every slot is reference counted.
#[derive(Clone)]
pub struct Plugin {
    name: Arc<str>,
    pub(crate) cache_key_will_be_used: Option<RequestHook>,
    pub(crate) request_will_fetch: Option<RequestHook>,
    pub(crate) fetch_did_fail: Option<FetchFailedHook>,
    pub(crate) fetch_did_succeed: Option<ResponseHook>,
    pub(crate) cache_will_update: Option<VetoHook>,
    pub(crate) cache_did_update: Option<CacheUpdatedHook>,
    pub(crate) cached_response_will_be_used: Option<VetoHook>,
}

impl Plugin {
    /// Creates a plugin with no hooks. `name` appears in logs and errors.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            cache_key_will_be_used: None,
            request_will_fetch: None,
            fetch_did_fail: None,
            fetch_did_succeed: None,
            cache_will_update: None,
            cache_did_update: None,
            cached_response_will_be_used: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rewrites the request used as the cache key, for both reads and writes.
    #[must_use]
    pub fn on_cache_key_will_be_used<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, BoxError>> + Send + 'static,
    {
        let slot: RequestHook = Arc::new(
            move |req: Request| -> BoxFuture<'static, Result<Request, BoxError>> {
                Box::pin(hook(req))
            },
        );
        self.cache_key_will_be_used = Some(slot);
        self
    }

    /// Rewrites the request before it is dispatched to the network.
    #[must_use]
    pub fn on_request_will_fetch<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, BoxError>> + Send + 'static,
    {
        let slot: RequestHook = Arc::new(
            move |req: Request| -> BoxFuture<'static, Result<Request, BoxError>> {
                Box::pin(hook(req))
            },
        );
        self.request_will_fetch = Some(slot);
        self
    }

    /// Observes a failed network dispatch. Errors are logged and ignored.
    #[must_use]
    pub fn on_fetch_did_fail<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Request, NetworkError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let slot: FetchFailedHook = Arc::new(
            move |req: Request, err: NetworkError| -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(hook(req, err))
            },
        );
        self.fetch_did_fail = Some(slot);
        self
    }

    /// Rewrites a successful network response.
    #[must_use]
    pub fn on_fetch_did_succeed<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
    {
        let slot: ResponseHook = Arc::new(
            move |req: Request, res: Response| -> BoxFuture<'static, Result<Response, BoxError>> {
                Box::pin(hook(req, res))
            },
        );
        self.fetch_did_succeed = Some(slot);
        self
    }

    /// Rewrites or vetoes (`Ok(None)`) a response about to be stored.
    #[must_use]
    pub fn on_cache_will_update<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        let slot: VetoHook = Arc::new(
            move |req: Request,
                  res: Response|
                  -> BoxFuture<'static, Result<Option<Response>, BoxError>> {
                Box::pin(hook(req, res))
            },
        );
        self.cache_will_update = Some(slot);
        self
    }

    /// Observes a completed cache write. Errors are logged and ignored.
    #[must_use]
    pub fn on_cache_did_update<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(CacheUpdate) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let slot: CacheUpdatedHook = Arc::new(
            move |update: CacheUpdate| -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(hook(update))
            },
        );
        self.cache_did_update = Some(slot);
        self
    }

    /// Rewrites or vetoes (`Ok(None)`) a cache hit before it is returned.
    #[must_use]
    pub fn on_cached_response_will_be_used<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        let slot: VetoHook = Arc::new(
            move |req: Request,
                  res: Response|
                  -> BoxFuture<'static, Result<Option<Response>, BoxError>> {
                Box::pin(hook(req, res))
            },
        );
        self.cached_response_will_be_used = Some(slot);
        self
    }

    /// Returns `true` if this plugin fills the given slot.
    pub fn implements(&self, hook: Hook) -> bool {
        match hook {
            Hook::CacheKeyWillBeUsed => self.cache_key_will_be_used.is_some(),
            Hook::RequestWillFetch => self.request_will_fetch.is_some(),
            Hook::FetchDidFail => self.fetch_did_fail.is_some(),
            Hook::FetchDidSucceed => self.fetch_did_succeed.is_some(),
            Hook::CacheWillUpdate => self.cache_will_update.is_some(),
            Hook::CacheDidUpdate => self.cache_did_update.is_some(),
            Hook::CachedResponseWillBeUsed => self.cached_response_will_be_used.is_some(),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ALL: [Hook; 7] = [
            Hook::CacheKeyWillBeUsed,
            Hook::RequestWillFetch,
            Hook::FetchDidFail,
            Hook::FetchDidSucceed,
            Hook::CacheWillUpdate,
            Hook::CacheDidUpdate,
            Hook::CachedResponseWillBeUsed,
        ];
        let hooks: Vec<_> = ALL
            .into_iter()
            .filter(|h| self.implements(*h))
            .map(Hook::as_str)
            .collect();
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("hooks", &hooks)
            .finish()
    }
}
