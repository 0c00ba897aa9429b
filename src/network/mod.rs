//! Network access: the transport collaborator and the facade in front of it.
//!
//! - [`Transport`]: dispatches a request and returns whatever the origin sent.
//!   Implemented automatically for any `Fn(Request) -> impl Future<Output =
//!   Result<Response, TransportError>>`.
//! - [`NetworkAccess`]: runs `request_will_fetch`, `fetch_did_succeed` and
//!   `fetch_did_fail` around every dispatch.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::BoxFuture;
use crate::error::{Error, NetworkError, TransportError};
use crate::http::{Request, Response, ResponseSource};
use crate::plugin::PluginChain;

/// The transport used to reach the network.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rtcache::error::TransportError;
/// use rtcache::http::{Request, Response, StatusCode};
/// use rtcache::network::Transport;
///
/// let transport: Arc<dyn Transport> = Arc::new(|_req: Request| async {
///     Ok::<_, TransportError>(Response::new(StatusCode::OK).body("from the wire"))
/// });
/// # let _ = transport;
/// ```
pub trait Transport: Send + Sync {
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>>;
}

impl<F, Fut> Transport for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, TransportError>> + Send + 'static,
{
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        Box::pin((self)(request))
    }
}

/// Wraps an async closure as a shared [`Transport`].
///
/// Spelling the bounds out here lets the closure's argument and `Ok`/`Err`
/// types be inferred at the call site.
///
/// # Examples
///
/// ```
/// use rtcache::http::{Response, StatusCode};
/// use rtcache::network::transport_fn;
///
/// let transport = transport_fn(|req| async move {
///     Ok(Response::new(StatusCode::OK).body(format!("fetched {}", req.url())))
/// });
/// # let _ = transport;
/// ```
pub fn transport_fn<F, Fut>(f: F) -> Arc<dyn Transport>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, TransportError>> + Send + 'static,
{
    Arc::new(f)
}

/// Plugin-aware front end for a [`Transport`].
#[derive(Clone)]
pub struct NetworkAccess {
    transport: Arc<dyn Transport>,
}

impl NetworkAccess {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetches `request` from the network.
    ///
    /// # Errors
    ///
    /// - [`Error::Plugin`]: `request_will_fetch` or `fetch_did_succeed` failed.
    /// - [`Error::Network`]: the transport failed. `fetch_did_fail` observers
    ///   have already run; the failure is never swallowed.
    pub async fn fetch(&self, request: &Request, plugins: &PluginChain) -> Result<Response, Error> {
        let request = plugins.request_will_fetch(request.clone()).await?;
        debug!(method = %request.method(), url = request.url(), "dispatching to network");

        match self.transport.dispatch(request.clone()).await {
            Ok(response) => {
                let response = response.with_source(ResponseSource::Network);
                debug!(url = request.url(), status = %response.status(), "network responded");
                Ok(plugins.fetch_did_succeed(&request, response).await?)
            }
            Err(source) => {
                let error = NetworkError {
                    url: request.url().to_owned(),
                    source,
                };
                debug!(url = request.url(), error = %error, "network request failed");
                plugins.fetch_did_fail(&request, &error).await;
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::http::StatusCode;
    use crate::plugin::Plugin;

    fn echo_url() -> NetworkAccess {
        NetworkAccess::new(transport_fn(|req| async move {
            Ok(Response::new(StatusCode::OK).body(req.url().to_owned()))
        }))
    }

    fn offline() -> NetworkAccess {
        NetworkAccess::new(transport_fn(|_req| async {
            Err(TransportError::Unreachable("offline".into()))
        }))
    }

    #[tokio::test]
    async fn request_will_fetch_rewrites_before_dispatch() {
        let plugins = PluginChain::new(vec![
            Plugin::new("versioned")
                .on_request_will_fetch(|req| async move { Ok(req.with_url("/v2/x")) }),
        ]);
        let res = echo_url().fetch(&Request::get("/x"), &plugins).await.unwrap();
        assert_eq!(res.text().unwrap(), "/v2/x");
    }

    #[tokio::test]
    async fn fetch_did_succeed_rewrites_response() {
        let plugins = PluginChain::new(vec![Plugin::new("stamp").on_fetch_did_succeed(
            |_req, res: Response| async move { Ok(res.header("X-Fetched", "1")) },
        )]);
        let res = echo_url().fetch(&Request::get("/x"), &plugins).await.unwrap();
        assert_eq!(res.headers().get("x-fetched"), Some("1"));
        assert_eq!(res.source(), ResponseSource::Network);
    }

    #[tokio::test]
    async fn failure_notifies_observers_and_propagates() {
        let failures = Arc::new(AtomicUsize::new(0));
        let observer = {
            let failures = Arc::clone(&failures);
            Plugin::new("observer").on_fetch_did_fail(move |_req, _err| {
                failures.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
        };
        let plugins = PluginChain::new(vec![observer]);

        let err = offline().fetch(&Request::get("/x"), &plugins).await.unwrap_err();
        assert!(matches!(err, Error::Network(ref e) if e.url == "/x"));
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_not_a_network_error() {
        let transport = NetworkAccess::new(transport_fn(|_req| async {
            Ok(Response::new(StatusCode::SERVICE_UNAVAILABLE))
        }));
        let res = transport
            .fetch(&Request::get("/x"), &PluginChain::default())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
