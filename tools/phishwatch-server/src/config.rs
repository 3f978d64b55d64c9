use std::time::Duration;

use phishwatch_core::resolver::{
    ResolverConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT,
};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub allowlist_path: Option<String>,
    pub resolver_timeout: Duration,
    pub resolver_max_redirects: u32,
    pub resolver_max_body_bytes: u64,
    /// Resolutions allowed in flight at once.
    pub max_concurrent_resolves: usize,
    /// How long a request waits for a resolver slot before degrading.
    pub resolve_queue: Duration,
    pub cors_permissive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            allowlist_path: None,
            resolver_timeout: DEFAULT_TIMEOUT,
            resolver_max_redirects: DEFAULT_MAX_REDIRECTS,
            resolver_max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_concurrent_resolves: 16,
            resolve_queue: Duration::from_millis(2000),
            cors_permissive: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let port = parsed_env("PORT").unwrap_or(defaults.port);
        let allowlist_path = optional_env("MARKETING_ALLOWLIST_PATH");
        let resolver_timeout = parsed_env("RESOLVER_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.resolver_timeout);
        let resolver_max_redirects =
            parsed_env("RESOLVER_MAX_REDIRECTS").unwrap_or(defaults.resolver_max_redirects);
        let resolver_max_body_bytes =
            parsed_env("RESOLVER_MAX_BODY_BYTES").unwrap_or(defaults.resolver_max_body_bytes);
        let max_concurrent_resolves =
            parsed_env("MAX_CONCURRENT_RESOLVES").unwrap_or(defaults.max_concurrent_resolves);
        assert!(
            max_concurrent_resolves > 0,
            "MAX_CONCURRENT_RESOLVES must be at least 1"
        );
        let resolve_queue = parsed_env("RESOLVE_QUEUE_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.resolve_queue);
        let cors_permissive = optional_env("CORS_PERMISSIVE")
            .map(|v| is_truthy(&v))
            .unwrap_or(defaults.cors_permissive);

        Config {
            port,
            allowlist_path,
            resolver_timeout,
            resolver_max_redirects,
            resolver_max_body_bytes,
            max_concurrent_resolves,
            resolve_queue,
            cors_permissive,
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            timeout: self.resolver_timeout,
            max_redirects: self.resolver_max_redirects,
            max_body_bytes: self.resolver_max_body_bytes,
            pool_max_idle_per_host: self.max_concurrent_resolves,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|v| {
        let v = v.trim().to_string();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

/// Unset means default; set but unparsable is a startup error.
fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    optional_env(key).map(|v| {
        v.parse()
            .unwrap_or_else(|_| panic!("invalid value for {key}: {v}"))
    })
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.resolver_timeout, Duration::from_millis(6000));
        assert_eq!(config.resolver_max_redirects, 10);
        assert_eq!(config.resolver_max_body_bytes, 2_097_152);
        assert_eq!(config.max_concurrent_resolves, 16);
        assert_eq!(config.resolve_queue, Duration::from_millis(2000));
        assert!(!config.cors_permissive);
    }

    #[test]
    fn test_resolver_config_carries_limits() {
        let config = Config {
            resolver_timeout: Duration::from_millis(1500),
            resolver_max_redirects: 3,
            ..Config::default()
        };
        let rc = config.resolver_config();
        assert_eq!(rc.timeout, Duration::from_millis(1500));
        assert_eq!(rc.max_redirects, 3);
        assert_eq!(rc.max_body_bytes, 2_097_152);
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("true"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("yes please"));
    }
}
