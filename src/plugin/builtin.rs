//! Plugins shipped with the engine.

use crate::http::{Headers, Response};

use super::Plugin;

/// Name of the plugin returned by [`cache_ok_and_opaque`].
pub const CACHE_OK_AND_OPAQUE: &str = "cache_ok_and_opaque";

/// Keeps `2xx` and opaque responses, vetoes every other write.
///
/// This is the policy [`StaleWhileRevalidate`](crate::strategy::StaleWhileRevalidate)
/// installs when none of its configured plugins fills `cache_will_update`.
pub fn cache_ok_and_opaque() -> Plugin {
    Plugin::new(CACHE_OK_AND_OPAQUE).on_cache_will_update(|_request, response: Response| async move {
        if response.is_success() || response.is_opaque() {
            Ok(Some(response))
        } else {
            Ok(None)
        }
    })
}

/// A `cache_will_update` policy built from allowed statuses and required headers.
///
/// A response is cacheable when its status is in the allow-list (if one is
/// given) *and* it carries every required header value (if any are given).
/// With neither configured, nothing is cacheable.
///
/// # Examples
///
/// ```
/// use rtcache::http::{Response, StatusCode};
/// use rtcache::plugin::CacheableResponse;
///
/// let policy = CacheableResponse::new()
///     .statuses([0, 200])
///     .header("X-Is-Cacheable", "true");
///
/// let ok = Response::new(StatusCode::OK).header("X-Is-Cacheable", "true");
/// assert!(policy.is_cacheable(&ok));
///
/// let missing_marker = Response::new(StatusCode::OK);
/// assert!(!policy.is_cacheable(&missing_marker));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacheableResponse {
    statuses: Vec<u16>,
    headers: Headers,
}

impl CacheableResponse {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_cacheable(&self, response: &Response) -> bool {
        if self.statuses.is_empty() && self.headers.is_empty() {
            return false;
        }
        let status_ok = self.statuses.is_empty()
            || self.statuses.contains(&response.status().as_u16());
        let headers_ok = self
            .headers
            .iter()
            .all(|(name, value)| response.headers().get_all(name).any(|v| v == value));
        status_ok && headers_ok
    }

    /// Wraps this policy in a plugin that fills `cache_will_update`.
    pub fn into_plugin(self) -> Plugin {
        Plugin::new("cacheable_response").on_cache_will_update(move |_request, response: Response| {
            let keep = self.is_cacheable(&response);
            async move { Ok(keep.then_some(response)) }
        })
    }
}
