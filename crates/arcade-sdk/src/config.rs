//! SDK configuration, from code or from the environment.

use arcade_heartbeat::HeartbeatConfig;
use arcade_pool::PoolConfig;
use arcade_session::SessionConfig;
use arcade_transport::RetryConfig;

/// Base URL of the hypervisor.
pub const ENV_ADDR: &str = "UAHV_ADDR";
/// `1` turns on debug logging.
pub const ENV_DEBUG: &str = "ARCADE_DEBUG";
/// `1` selects the offline stand-in instead of a live hypervisor.
pub const ENV_MOCK: &str = "ARCADE_MOCK";

/// Everything the SDK needs to know at construction time.
///
/// The base URL is fixed for the lifetime of the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    /// Where the hypervisor listens. Default: `http://localhost:8083`.
    pub base_url: String,
    /// Log at debug level when [`init_tracing`](crate::init_tracing) is
    /// given this flag.
    pub debug: bool,
    /// Answer every call from the offline stand-in; nothing touches the
    /// network.
    pub offline: bool,
    /// Heartbeat schedule for active slips.
    pub heartbeat: HeartbeatConfig,
    /// Heartbeat schedule for live pools.
    pub pool_heartbeat: HeartbeatConfig,
    pub retry: RetryConfig,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            debug: false,
            offline: false,
            heartbeat: SessionConfig::default().heartbeat,
            pool_heartbeat: PoolConfig::default().heartbeat,
            retry: RetryConfig::default(),
        }
    }
}

impl SdkConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8083";

    /// Reads `UAHV_ADDR`, `ARCADE_DEBUG`, and `ARCADE_MOCK` from the
    /// process environment. Anything unset keeps its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads through `lookup`.
    ///
    /// ```rust
    /// use arcade_sdk::SdkConfig;
    ///
    /// let config = SdkConfig::from_lookup(|key| match key {
    ///     "ARCADE_MOCK" => Some("1".into()),
    ///     _ => None,
    /// });
    /// assert!(config.offline);
    /// assert_eq!(config.base_url, "http://localhost:8083");
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(addr) = lookup(ENV_ADDR).filter(|addr| !addr.trim().is_empty()) {
            config.base_url = addr.trim().to_owned();
        }
        config.debug = lookup(ENV_DEBUG).is_some_and(|v| is_enabled(&v));
        config.offline = lookup(ENV_MOCK).is_some_and(|v| is_enabled(&v));
        config
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            heartbeat: self.heartbeat,
            ..SessionConfig::default()
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            heartbeat: self.pool_heartbeat,
        }
    }
}

fn is_enabled(value: &str) -> bool {
    matches!(value.trim(), "1" | "true")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SdkConfig::default();
        assert_eq!(config.base_url, "http://localhost:8083");
        assert!(!config.debug);
        assert!(!config.offline);
        assert_eq!(config.heartbeat.interval, Duration::from_secs(10));
        assert!(!config.heartbeat.immediate);
        assert!(config.pool_heartbeat.immediate);
    }

    #[test]
    fn test_from_lookup_reads_all_keys() {
        let config = SdkConfig::from_lookup(lookup(&[
            ("UAHV_ADDR", "http://hv.internal:9000"),
            ("ARCADE_DEBUG", "1"),
            ("ARCADE_MOCK", "1"),
        ]));
        assert_eq!(config.base_url, "http://hv.internal:9000");
        assert!(config.debug);
        assert!(config.offline);
    }

    #[test]
    fn test_from_lookup_ignores_other_values() {
        let config = SdkConfig::from_lookup(lookup(&[
            ("UAHV_ADDR", "  "),
            ("ARCADE_DEBUG", "0"),
            ("ARCADE_MOCK", "yes please"),
        ]));
        assert_eq!(config.base_url, SdkConfig::DEFAULT_BASE_URL);
        assert!(!config.debug);
        assert!(!config.offline);
    }
}
