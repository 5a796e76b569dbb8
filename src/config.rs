// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the HTML pastebin service.
//!
//! Every field has a serde default so a partial config file (or none at all)
//! yields a runnable service. [`Config::from_env`] layers environment
//! variables on top of the defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the HTML pastebin service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL that site names are joined onto (default: http://localhost:8080/)
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Site storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pasted content limits
    #[serde(default)]
    pub content: ContentConfig,

    /// Name generation configuration
    #[serde(default)]
    pub names: NameConfig,

    /// Throttle configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Admin gate configuration
    #[serde(default)]
    pub admin: AdminConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Where site documents live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Flat directory holding one `<name>.html` per site (default: public/sites)
    #[serde(default = "default_sites_dir")]
    pub sites_dir: PathBuf,
}

/// Limits applied to pasted HTML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Maximum accepted content size in bytes, inclusive (default: 512000)
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

/// Random name generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameConfig {
    /// Shortest generated name (default: 6)
    #[serde(default = "default_min_generated_len")]
    pub min_generated_len: usize,

    /// Longest generated name (default: 9)
    #[serde(default = "default_max_generated_len")]
    pub max_generated_len: usize,

    /// Collision retries before giving up (default: 16)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Cooldown throttles for creation and admin login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum spacing between creations per client in milliseconds (default: 10000)
    #[serde(default = "default_create_cooldown_ms")]
    pub create_cooldown_ms: u64,

    /// Minimum spacing between admin login attempts per client in milliseconds (default: 3000)
    #[serde(default = "default_login_cooldown_ms")]
    pub login_cooldown_ms: u64,

    /// How often stale throttle entries are evicted in seconds (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Key clients by the first X-Forwarded-For hop instead of the peer address
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

/// Admin credential and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Expected admin username (default: admin)
    #[serde(default = "default_admin_username")]
    pub username: String,

    /// Expected admin password; admin access is disabled when unset
    #[serde(default)]
    pub password: Option<String>,

    /// Delay applied to every login attempt in milliseconds (default: 1000)
    #[serde(default = "default_login_delay_ms")]
    pub login_delay_ms: u64,

    /// Session token lifetime in seconds (default: 3600)
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Hex-encoded 32-byte session signing key; random per process when unset
    #[serde(default)]
    pub session_key: Option<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080/".to_string()
}

fn default_sites_dir() -> PathBuf {
    PathBuf::from("public/sites")
}

fn default_max_bytes() -> usize {
    500 * 1024
}

fn default_min_generated_len() -> usize {
    6
}

fn default_max_generated_len() -> usize {
    9
}

fn default_max_attempts() -> u32 {
    16
}

fn default_create_cooldown_ms() -> u64 {
    10_000
}

fn default_login_cooldown_ms() -> u64 {
    3_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_login_delay_ms() -> u64 {
    1_000
}

fn default_session_ttl_secs() -> u64 {
    3_600
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_base_url: default_public_base_url(),
            storage: StorageConfig::default(),
            content: ContentConfig::default(),
            names: NameConfig::default(),
            rate_limit: RateLimitConfig::default(),
            admin: AdminConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sites_dir: default_sites_dir(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            min_generated_len: default_min_generated_len(),
            max_generated_len: default_max_generated_len(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            create_cooldown_ms: default_create_cooldown_ms(),
            login_cooldown_ms: default_login_cooldown_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            trust_forwarded_for: false,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: None,
            login_delay_ms: default_login_delay_ms(),
            session_ttl_secs: default_session_ttl_secs(),
            session_key: None,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl RateLimitConfig {
    /// Get the creation cooldown
    pub fn create_cooldown(&self) -> Duration {
        Duration::from_millis(self.create_cooldown_ms)
    }

    /// Get the login cooldown
    pub fn login_cooldown(&self) -> Duration {
        Duration::from_millis(self.login_cooldown_ms)
    }

    /// Get the sweep period (at least one second)
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl AdminConfig {
    pub fn login_delay(&self) -> Duration {
        Duration::from_millis(self.login_delay_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl Config {
    /// Load configuration from environment variables (and a `.env` file if present).
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            public_base_url: std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            storage: StorageConfig {
                sites_dir: std::env::var("SITES_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.sites_dir),
            },
            content: ContentConfig {
                max_bytes: env_parse("MAX_CONTENT_BYTES").unwrap_or(defaults.content.max_bytes),
            },
            names: defaults.names,
            rate_limit: RateLimitConfig {
                create_cooldown_ms: env_parse("CREATE_COOLDOWN_MS")
                    .unwrap_or(defaults.rate_limit.create_cooldown_ms),
                login_cooldown_ms: env_parse("LOGIN_COOLDOWN_MS")
                    .unwrap_or(defaults.rate_limit.login_cooldown_ms),
                sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS")
                    .unwrap_or(defaults.rate_limit.sweep_interval_secs),
                trust_forwarded_for: env_parse("TRUST_FORWARDED_FOR")
                    .unwrap_or(defaults.rate_limit.trust_forwarded_for),
            },
            admin: AdminConfig {
                username: std::env::var("ADMIN_USERNAME").unwrap_or(defaults.admin.username),
                password: std::env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
                login_delay_ms: env_parse("ADMIN_LOGIN_DELAY_MS")
                    .unwrap_or(defaults.admin.login_delay_ms),
                session_ttl_secs: env_parse("ADMIN_SESSION_TTL_SECS")
                    .unwrap_or(defaults.admin.session_ttl_secs),
                session_key: std::env::var("ADMIN_SESSION_KEY").ok(),
            },
            metrics: MetricsConfig {
                enabled: env_parse("METRICS_ENABLED").unwrap_or(defaults.metrics.enabled),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
