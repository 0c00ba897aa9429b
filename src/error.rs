//! Error types raised by the facades and strategies.
//!
//! Every error here is `Clone`: a single network failure may have to reach
//! both the caller and the background task registrar, so underlying causes
//! are held behind [`Arc`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::plugin::Hook;

/// Type-erased error returned by plugin hooks and collaborator implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared, clonable form of a [`BoxError`].
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a [`Transport`](crate::network::Transport).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("host unreachable: {0}")]
    Unreachable(String),

    #[error("request was aborted")]
    Aborted,

    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Other(SharedError),
}

impl TransportError {
    /// Wraps an arbitrary transport-level error.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(Arc::from(err.into()))
    }
}

/// The network facade could not obtain a response.
#[derive(Debug, Clone, Error)]
#[error("network request for {url} failed: {source}")]
pub struct NetworkError {
    pub url: String,
    #[source]
    pub source: TransportError,
}

/// Neither the cache nor, where applicable, the network produced a response.
#[derive(Debug, Clone, Error)]
#[error("no response available for {url}")]
pub struct NoResponseError {
    pub url: String,
    /// The network failure that preceded the cache miss, if the strategy tried the network.
    #[source]
    pub network: Option<NetworkError>,
}

/// A transforming plugin hook returned an error.
#[derive(Debug, Clone, Error)]
#[error("plugin `{plugin}` failed in {hook}: {source}")]
pub struct PluginError {
    pub plugin: String,
    pub hook: Hook,
    #[source]
    pub source: SharedError,
}

impl PluginError {
    pub(crate) fn new(plugin: &str, hook: Hook, source: BoxError) -> Self {
        Self {
            plugin: plugin.to_owned(),
            hook,
            source: Arc::from(source),
        }
    }
}

/// The cache store rejected a read or write.
#[derive(Debug, Clone, Error)]
#[error("cache `{cache_name}` storage failure: {message}")]
pub struct StorageError {
    pub cache_name: String,
    pub message: String,
}

impl StorageError {
    pub fn new(cache_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by the cache and network facades.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    NoResponse(#[from] NoResponseError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// An [`Error`] annotated with the strategy that was handling the request.
#[derive(Debug, Clone, Error)]
#[error("{strategy} could not handle request: {source}")]
pub struct StrategyError {
    pub strategy: &'static str,
    #[source]
    pub source: Error,
}

impl StrategyError {
    pub(crate) fn new(strategy: &'static str, source: impl Into<Error>) -> Self {
        Self {
            strategy,
            source: source.into(),
        }
    }

    /// Returns the underlying facade error.
    pub fn kind(&self) -> &Error {
        &self.source
    }

    pub fn into_inner(self) -> Error {
        self.source
    }

    pub fn is_no_response(&self) -> bool {
        matches!(self.source, Error::NoResponse(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self.source, Error::Network(_))
    }

    pub fn is_plugin(&self) -> bool {
        matches!(self.source, Error::Plugin(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
