use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "consent_engine";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Consent stays valid for one year from the acceptance date.
pub const CONSENT_VALIDITY_DAYS: i64 = 365;

/// Renewal warning starts this many days before expiry.
pub const RENEWAL_WARNING_DAYS: i64 = 30;

/// LFPDPPP: controller must answer an ARCO request within 20 business days.
pub const ARCO_RESPONSE_BUSINESS_DAYS: u32 = 20;

/// LFPDPPP: an accepted ARCO request must be executed within 15 business days
/// after the response.
pub const ARCO_EXECUTION_BUSINESS_DAYS: u32 = 15;

/// Open ARCO requests this close to their response deadline are flagged.
pub const ARCO_DUE_SOON_BUSINESS_DAYS: i64 = 5;

/// Default consent-status poll interval while waiting on a notice.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default lifetime of a cached consent snapshot.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    format!("{}=info,warn", APP_NAME)
}

/// Connection settings for the privacy API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token issued by the outer session layer.
    pub token: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read `PRIVACY_API_URL`, `PRIVACY_API_TOKEN` and
    /// `PRIVACY_API_TIMEOUT_SECS`, falling back to local defaults.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("PRIVACY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&base_url);
        config.token = std::env::var("PRIVACY_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        if let Some(secs) = std::env::var("PRIVACY_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Behaviour knobs for the stores and the orchestrator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_ttl: Duration,
    pub poll_interval: Duration,
    pub due_soon_business_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            due_soon_business_days: ARCO_DUE_SOON_BUSINESS_DAYS,
        }
    }
}
