//! Strategy configuration.
//!
//! Both types deserialize from partial documents; missing fields take their
//! defaults.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_PREFIX: &str = "rtcache";
const DEFAULT_RUNTIME: &str = "runtime";

/// Naming scheme for the default runtime cache.
///
/// # Examples
///
/// ```
/// use rtcache::config::CacheNames;
///
/// assert_eq!(CacheNames::default().runtime_name(), "rtcache-runtime");
///
/// let scoped = CacheNames { suffix: "https://app.example/".into(), ..Default::default() };
/// assert_eq!(scoped.runtime_name(), "rtcache-runtime-https://app.example/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheNames {
    pub prefix: String,
    pub runtime: String,
    /// Usually the scope of the host, so separate hosts sharing a store do not collide.
    pub suffix: String,
}

impl Default for CacheNames {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_owned(),
            runtime: DEFAULT_RUNTIME.to_owned(),
            suffix: String::new(),
        }
    }
}

impl CacheNames {
    /// Joins the non-empty parts with `-`.
    pub fn runtime_name(&self) -> String {
        [&self.prefix, &self.runtime, &self.suffix]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Returns `user_name` when given, the runtime cache name otherwise.
    pub fn resolve(&self, user_name: Option<&str>) -> String {
        match user_name {
            Some(name) => name.to_owned(),
            None => self.runtime_name(),
        }
    }
}

/// Per-strategy options.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rtcache::config::StrategyOptions;
///
/// let options = StrategyOptions::from_json(r#"{"cache_name":"api","network_timeout_seconds":3}"#).unwrap();
/// assert_eq!(options.cache_name.as_deref(), Some("api"));
/// assert_eq!(options.network_timeout(), Some(Duration::from_secs(3)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StrategyOptions {
    /// Cache to read and write. Defaults to [`CacheNames::runtime_name`].
    pub cache_name: Option<String>,
    /// Only honoured by `NetworkFirst`.
    pub network_timeout_seconds: Option<u64>,
}

impl StrategyOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout_seconds.map(Duration::from_secs)
    }
}
