//! # rtcache
//!
//! Pluggable runtime request-caching strategies.
//!
//! Given an intercepted request, a [`Strategy`] decides whether to answer
//! from a cache, from the network, or both, and keeps the cache coherent
//! afterwards. Plugins observe, rewrite or veto every cache and network
//! operation; work that must outlive the response is handed to
//! [`BackgroundTasks`] so the host can wait for it before shutting down.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use rtcache::{BackgroundTasks, CacheContext, Request, Response, StatusCode};
//! use rtcache::cache::MemoryCacheStorage;
//! use rtcache::network::transport_fn;
//! use rtcache::strategy::{StaleWhileRevalidate, Strategy};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = CacheContext::new(
//!         Arc::new(MemoryCacheStorage::new()),
//!         transport_fn(|_req| async { Ok(Response::new(StatusCode::OK).body("Hello, World!")) }),
//!     );
//!     let strategy = StaleWhileRevalidate::new(&context);
//!
//!     let tasks = BackgroundTasks::new();
//!     let response = strategy.handle(Request::get("/greeting"), &tasks).await?;
//!     println!("{}", response.text()?);
//!
//!     tasks.settle().await;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod background;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod network;
pub mod plugin;
pub mod strategy;

/// A boxed, `Send` future borrowed for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use background::BackgroundTasks;
pub use context::CacheContext;
pub use error::{Error, StrategyError};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use plugin::{Plugin, PluginChain};
pub use strategy::Strategy;
