//! Configuration management for the bridge
//!
//! TOML configuration with environment variable overrides and sensible
//! defaults. The store connection parameters describe the external backend
//! the wire client connects to; the bridge itself only consumes them through
//! the builder.

use crate::error::Error;
use crate::schema::{SchemaResolver, SchemaRule};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Backing store connection settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Cache TTL settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retention schema rules
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Data-availability bound settings
    #[serde(default)]
    pub bounds: BoundsConfig,
}

/// Backing store connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Store host
    #[serde(default = "default_host")]
    pub host: String,

    /// Store port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Store user
    #[serde(default = "default_user")]
    pub user: String,

    /// Store password
    #[serde(default = "default_password")]
    pub password: String,

    /// Database holding the metric series
    #[serde(default = "default_database")]
    pub database: String,

    /// Budget for any single store or search-index call, in milliseconds
    ///
    /// An elapsed budget is an ordinary query failure, not a fatal condition.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

/// Cache TTL settings
///
/// TTL is the only consistency mechanism between the bridge and the backing
/// store; these values trade staleness against backend load.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL for cached series listings, in seconds
    #[serde(default = "default_series_list_ttl_secs")]
    pub series_list_ttl_secs: u64,

    /// TTL for cached leaves and branches, in seconds
    #[serde(default = "default_nodes_ttl_secs")]
    pub nodes_ttl_secs: u64,
}

/// Retention schema rules
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaConfig {
    /// Step applied when no rule matches, in seconds
    #[serde(default = "default_step")]
    pub default_step: i64,

    /// Ordered rule list; first match wins
    #[serde(default)]
    pub rules: Vec<SchemaRuleConfig>,
}

/// A single retention rule in configuration form
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaRuleConfig {
    /// Regex matched against the full series name
    pub pattern: String,
    /// Step in seconds for matching names
    pub step: i64,
}

/// Data-availability bound settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoundsConfig {
    /// Return synthetic `(1, now)` bounds without consulting the store
    ///
    /// Explicit accuracy-for-latency trade; never a silent fallback.
    #[serde(default)]
    pub fast_mode: bool,

    /// First-bound TTL as a multiple of the series step
    ///
    /// The first timestamp of a series changes rarely, so it is cached for
    /// `step * first_ttl_factor` seconds. The last bound always uses a TTL of
    /// one step.
    #[serde(default = "default_first_ttl_factor")]
    pub first_ttl_factor: u64,
}

// Default value functions
fn default_host() -> String { "localhost".to_string() }
fn default_port() -> u16 { 8086 }
fn default_user() -> String { "graphite".to_string() }
fn default_password() -> String { "graphite".to_string() }
fn default_database() -> String { "graphite".to_string() }
fn default_query_timeout_ms() -> u64 { 5_000 }
fn default_series_list_ttl_secs() -> u64 { 900 }
fn default_nodes_ttl_secs() -> u64 { 900 }
fn default_step() -> i64 { 60 }
fn default_first_ttl_factor() -> u64 { 60 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: default_password(),
            database: default_database(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            series_list_ttl_secs: default_series_list_ttl_secs(),
            nodes_ttl_secs: default_nodes_ttl_secs(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            default_step: default_step(),
            rules: Vec::new(),
        }
    }
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            fast_mode: false,
            first_ttl_factor: default_first_ttl_factor(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path, e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self, Error> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `BRIDGE_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("BRIDGE_STORE_HOST") {
            self.store.host = host;
        }
        if let Ok(port) = std::env::var("BRIDGE_STORE_PORT") {
            if let Ok(p) = port.parse() {
                self.store.port = p;
            }
        }
        if let Ok(db) = std::env::var("BRIDGE_STORE_DB") {
            self.store.database = db;
        }
        if let Ok(step) = std::env::var("BRIDGE_DEFAULT_STEP") {
            if let Ok(s) = step.parse() {
                self.schema.default_step = s;
            }
        }
        if let Ok(fast) = std::env::var("BRIDGE_FAST_BOUNDS") {
            self.bounds.fast_mode = fast == "1" || fast.eq_ignore_ascii_case("true");
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.store.port == 0 {
            return Err(Error::Configuration("Store port cannot be 0".to_string()));
        }
        if self.store.query_timeout_ms == 0 {
            return Err(Error::Configuration(
                "Query timeout must be > 0".to_string(),
            ));
        }
        if self.schema.default_step <= 0 {
            return Err(Error::Configuration(
                "Default step must be > 0".to_string(),
            ));
        }
        if self.bounds.first_ttl_factor == 0 {
            return Err(Error::Configuration(
                "First-bound TTL factor must be > 0".to_string(),
            ));
        }
        // Rule compilation confirms the patterns parse.
        self.build_resolver()?;
        Ok(())
    }

    /// Compile the schema rules into a [`SchemaResolver`]
    pub fn build_resolver(&self) -> Result<SchemaResolver, Error> {
        let mut rules = Vec::with_capacity(self.schema.rules.len());
        for rule in &self.schema.rules {
            rules.push(SchemaRule::new(&rule.pattern, rule.step)?);
        }
        Ok(SchemaResolver::new(rules, self.schema.default_step))
    }
}
