//! TOML-based connector configuration.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::aggregate::ranking::DEFAULT_COVERAGE_THRESHOLD;
use crate::error::ConnectorError;

/// Top-level configuration parsed from TOML.
///
/// All fields have defaults pointing at the public EIA and CER endpoints.
/// Load from TOML with [`FeedsConfig::from_toml_file`] or use
/// [`FeedsConfig::defaults`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedsConfig {
    /// EIA time-series API settings.
    #[serde(default)]
    pub eia: EiaConfig,
    /// CER bulk CSV settings.
    #[serde(default)]
    pub cer: CerConfig,
    /// Top-producers pipeline tuning.
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    /// Outgoing HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Caller-facing deadlines.
    #[serde(default)]
    pub service: ServiceConfig,
}

/// EIA time-series API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EiaConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Inline API key; takes precedence over `api_key_env` when set.
    pub api_key: Option<String>,
    /// Rows requested per series page (1..=5000).
    pub page_length: usize,
}

impl Default for EiaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.eia.gov/v2".to_string(),
            api_key_env: "EIA_API_KEY".to_string(),
            api_key: None,
            page_length: MAX_EIA_PAGE_LENGTH,
        }
    }
}

/// Upper bound on rows per EIA request.
pub const MAX_EIA_PAGE_LENGTH: usize = 5000;

impl EiaConfig {
    /// Resolves the credential from the inline value or the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] when neither source yields a
    /// non-empty key.
    pub fn resolve_api_key(&self) -> Result<String, ConnectorError> {
        let from_inline = self.api_key.clone().filter(|k| !k.trim().is_empty());
        let key = from_inline.or_else(|| {
            env::var(&self.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty())
        });
        key.ok_or_else(|| ConnectorError::Configuration(format!("{} is not set", self.api_key_env)))
    }
}

/// CER bulk CSV settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CerConfig {
    /// Bulk CSV download URL.
    pub csv_url: String,
    /// Seconds a parsed CSV snapshot stays valid (must be > 0).
    pub cache_ttl_secs: u64,
}

impl Default for CerConfig {
    fn default() -> Self {
        Self {
            csv_url: "https://www.cer-rec.gc.ca/open/energy/estimated-monthly-production-of-crude-oil-by-province.csv"
                .to_string(),
            cache_ttl_secs: 3600,
        }
    }
}

/// Top-producers pipeline tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregatorConfig {
    /// Simultaneous in-flight upstream requests (must be > 0).
    pub concurrency: usize,
    /// Minimum share of rows a period must exceed to be selected, in `[0, 1)`.
    pub coverage_threshold: f64,
    /// Rows returned when the caller gives no limit.
    pub default_limit: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            coverage_threshold: DEFAULT_COVERAGE_THRESHOLD,
            default_limit: 10,
        }
    }
}

/// Outgoing HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("energy-feeds/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Caller-facing deadlines.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Deadline for one envelope-producing call, in seconds.
    pub upstream_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upstream_timeout_secs: 20,
        }
    }
}

impl ServiceConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"aggregator.concurrency"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl FeedsConfig {
    /// Returns the built-in configuration.
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. A missing EIA
    /// credential is not reported here; it only fails EIA operations.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let eia = &self.eia;
        if !eia.base_url.starts_with("http://") && !eia.base_url.starts_with("https://") {
            errors.push(ConfigError {
                field: "eia.base_url".into(),
                message: format!("must be an http(s) URL, got \"{}\"", eia.base_url),
            });
        }
        if eia.page_length == 0 || eia.page_length > MAX_EIA_PAGE_LENGTH {
            errors.push(ConfigError {
                field: "eia.page_length".into(),
                message: format!("must be in 1..={MAX_EIA_PAGE_LENGTH}"),
            });
        }
        if eia.api_key_env.trim().is_empty() {
            errors.push(ConfigError {
                field: "eia.api_key_env".into(),
                message: "must not be empty".into(),
            });
        }

        let cer = &self.cer;
        if !cer.csv_url.starts_with("http://") && !cer.csv_url.starts_with("https://") {
            errors.push(ConfigError {
                field: "cer.csv_url".into(),
                message: format!("must be an http(s) URL, got \"{}\"", cer.csv_url),
            });
        }
        if cer.cache_ttl_secs == 0 {
            errors.push(ConfigError {
                field: "cer.cache_ttl_secs".into(),
                message: "must be > 0".into(),
            });
        }

        let agg = &self.aggregator;
        if agg.concurrency == 0 {
            errors.push(ConfigError {
                field: "aggregator.concurrency".into(),
                message: "must be > 0".into(),
            });
        }
        if !(0.0..1.0).contains(&agg.coverage_threshold) {
            errors.push(ConfigError {
                field: "aggregator.coverage_threshold".into(),
                message: "must be in [0.0, 1.0)".into(),
            });
        }
        if agg.default_limit == 0 {
            errors.push(ConfigError {
                field: "aggregator.default_limit".into(),
                message: "must be > 0".into(),
            });
        }

        if self.http.timeout_secs == 0 {
            errors.push(ConfigError {
                field: "http.timeout_secs".into(),
                message: "must be > 0".into(),
            });
        }
        if self.service.upstream_timeout_secs == 0 {
            errors.push(ConfigError {
                field: "service.upstream_timeout_secs".into(),
                message: "must be > 0".into(),
            });
        }

        errors
    }
}
