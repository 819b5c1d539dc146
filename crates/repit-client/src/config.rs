//! Service client configuration

use std::collections::BTreeMap;
use std::time::Duration;

/// Default gateway address inside the compose network
pub const DEFAULT_GATEWAY_URL: &str = "http://api-gateway:8000";

/// Known services and the port each listens on
pub const SERVICES: &[(&str, u16)] = &[
    ("user", 8001),
    ("lesson", 8002),
    ("homework", 8003),
    ("payment", 8004),
    ("material", 8005),
    ("notification", 8006),
    ("analytics", 8007),
    ("student", 8008),
];

/// Configuration for [`crate::ServiceHttpClient`]
#[derive(Clone, Debug)]
pub struct ServiceClientConfig {
    pub api_gateway_url: String,
    /// Route every call through the gateway instead of the service itself
    pub use_api_gateway: bool,
    pub service_urls: BTreeMap<String, String>,
    pub timeout: Duration,
    /// Attempts per request, including the first
    pub max_retries: u32,
    /// Base delay, doubled after every failed attempt
    pub retry_delay: Duration,
    pub client_name: String,
    pub client_version: String,
}

impl Default for ServiceClientConfig {
    fn default() -> Self {
        Self {
            api_gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            use_api_gateway: true,
            service_urls: SERVICES
                .iter()
                .map(|(name, port)| (name.to_string(), format!("http://{}-service:{}", name, port)))
                .collect(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            client_name: "telegram-bot".to_string(),
            client_version: "1.0.0".to_string(),
        }
    }
}

impl ServiceClientConfig {
    /// Config that routes through the gateway at `url`
    pub fn with_gateway(url: &str) -> Self {
        Self {
            api_gateway_url: url.trim_end_matches('/').to_string(),
            use_api_gateway: true,
            ..Default::default()
        }
    }

    /// Call services directly rather than through the gateway
    pub fn direct(mut self) -> Self {
        self.use_api_gateway = false;
        self
    }

    pub fn with_service_url(mut self, service: &str, url: &str) -> Self {
        self.service_urls
            .insert(service.to_string(), url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set attempt count and base backoff delay
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_client_identity(mut self, name: &str, version: &str) -> Self {
        self.client_name = name.to_string();
        self.client_version = version.to_string();
        self
    }

    /// Read `API_GATEWAY_URL`, `USE_API_GATEWAY` and `<SERVICE>_SERVICE_URL`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("API_GATEWAY_URL") {
            config.api_gateway_url = url.trim_end_matches('/').to_string();
        }
        if let Some(flag) = lookup("USE_API_GATEWAY") {
            config.use_api_gateway = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        for (name, _) in SERVICES {
            let key = format!("{}_SERVICE_URL", name.to_ascii_uppercase());
            if let Some(url) = lookup(&key) {
                config
                    .service_urls
                    .insert(name.to_string(), url.trim_end_matches('/').to_string());
            }
        }
        config
    }

    /// Backoff before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}
