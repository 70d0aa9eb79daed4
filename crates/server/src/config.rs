//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `GEOCODE_APIKEY` - Yandex Geocoder API key
//!
//! ## Optional
//! - `SERVER_HOST` - Bind address (default: 127.0.0.1)
//! - `SERVER_PORT` - Listen port (default: 8000)
//! - `GEOCODE_BASE_URL` - Geocoder endpoint (default: <https://geocode-maps.yandex.ru/1.x>)
//! - `GEOCODE_TIMEOUT_SECS` - Per-request geocoder timeout (default: 5)
//! - `GEOCODE_CACHE_TTL_DAYS` - Age after which cached coordinates are re-fetched (default: 30)
//! - `GEOCODE_CONCURRENCY` - Parallel geocoder calls per matching pass (default: 4)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
pub const DEFAULT_GEOCODE_BASE_URL: &str = "https://geocode-maps.yandex.ru/1.x";
pub const DEFAULT_GEOCODE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CACHE_TTL_DAYS: i64 = 30;
pub const DEFAULT_GEOCODE_CONCURRENCY: usize = 4;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Geocoder client configuration
    pub geocoder: GeocoderConfig,
    /// Geocode cache configuration
    pub geocode_cache: GeocodeCacheConfig,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// Non-fatal problems found while loading, to be logged once tracing is up
    pub warnings: Vec<String>,
}

/// Geocoding provider configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GeocoderConfig {
    /// Provider API key
    pub api_key: SecretString,
    /// Endpoint queried with `geocode`, `apikey` and `format` parameters
    pub base_url: String,
    /// Timeout for a single geocoding request
    pub timeout: Duration,
}

impl std::fmt::Debug for GeocoderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocoderConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeocoderConfig {
    /// Configuration for the default endpoint with the default timeout.
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_GEOCODE_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_GEOCODE_TIMEOUT_SECS),
        }
    }

    fn from_env(warnings: &mut Vec<String>) -> Result<Self, ConfigError> {
        let api_key = get_required_env("GEOCODE_APIKEY")?;
        warnings.extend(api_key_warning(&api_key));

        let timeout_secs = parse_env_or_default("GEOCODE_TIMEOUT_SECS", DEFAULT_GEOCODE_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "GEOCODE_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_key: SecretString::from(api_key),
            base_url: get_env_or_default("GEOCODE_BASE_URL", DEFAULT_GEOCODE_BASE_URL),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Geocode cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct GeocodeCacheConfig {
    /// Entries older than this are re-resolved before use
    pub ttl: chrono::Duration,
    /// Maximum number of geocoder calls in flight during one matching pass
    pub concurrency: usize,
}

impl Default for GeocodeCacheConfig {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::days(DEFAULT_CACHE_TTL_DAYS),
            concurrency: DEFAULT_GEOCODE_CONCURRENCY,
        }
    }
}

impl GeocodeCacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let ttl_days = parse_env_or_default("GEOCODE_CACHE_TTL_DAYS", DEFAULT_CACHE_TTL_DAYS)?;
        let ttl = ttl_from_days(ttl_days)?;

        let concurrency = parse_env_or_default("GEOCODE_CONCURRENCY", DEFAULT_GEOCODE_CONCURRENCY)?;

        Ok(Self {
            ttl,
            concurrency: concurrency.max(1),
        })
    }
}

fn ttl_from_days(days: i64) -> Result<chrono::Duration, ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::InvalidEnvVar("GEOCODE_CACHE_TTL_DAYS".to_string(), reason.to_string())
    };
    if days <= 0 {
        return Err(invalid("must be greater than zero"));
    }
    chrono::Duration::try_days(days).ok_or_else(|| invalid("out of range"))
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("SERVER_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SERVER_HOST".to_string(), e.to_string()))?;
        let port = parse_env_or_default("SERVER_PORT", 8000_u16)?;

        let mut warnings = Vec::new();
        let geocoder = GeocoderConfig::from_env(&mut warnings)?;
        let geocode_cache = GeocodeCacheConfig::from_env()?;
        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            geocoder,
            geocode_cache,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            warnings,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Provider keys are opaque, so a weak-looking key is reported but not fatal.
fn api_key_warning(api_key: &str) -> Option<String> {
    validate_secret_strength(api_key, "GEOCODE_APIKEY")
        .err()
        .map(|e| format!("GEOCODE_APIKEY validation warning: {e}"))
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}
