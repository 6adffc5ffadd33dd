//! Dashboard configuration.
//!
//! Settings are read from a TOML file (default `pps_dashboard.toml`) and then
//! overridden by `PPS_*` environment variables, which `dotenv` may have
//! populated from a `.env` file. A missing config file is not an error;
//! every setting has a default matching the public JKM endpoint.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::logging::LogLevel;
use crate::model::FieldMapping;

pub const DEFAULT_CONFIG_PATH: &str = "pps_dashboard.toml";

pub const DEFAULT_API_URL: &str =
    "https://infobencanajkmv2.jkm.gov.my/api/data-dashboard-table-pps.php";
pub const DEFAULT_RELAY_URL: &str = "http://localhost:3000/api/flood-data";
pub const DEFAULT_SEASON_ID: u32 = 208;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid config value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Enumerated settings
// ---------------------------------------------------------------------------

/// Where records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Request the JKM API directly.
    #[default]
    Direct,
    /// Request a local proxy that re-exposes the JKM API.
    Relay,
    /// Use the bundled sample records only.
    Sample,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(SourceKind::Direct),
            "relay" | "proxy" => Ok(SourceKind::Relay),
            "sample" => Ok(SourceKind::Sample),
            other => Err(format!(
                "unknown source '{}' (expected direct, relay or sample)",
                other
            )),
        }
    }
}

/// What to do when the configured remote source fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Surface the fetch error to the caller.
    #[default]
    Error,
    /// Log the error and serve the bundled sample records instead.
    Sample,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(FailurePolicy::Error),
            "sample" => Ok(FailurePolicy::Sample),
            other => Err(format!(
                "unknown failure policy '{}' (expected error or sample)",
                other
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub api_url: String,
    pub relay_url: String,
    /// `seasonmain_id` query parameter: the flood season to report on.
    pub season_id: u32,
    /// `seasonnegeri_id` query parameter. Empty means all states.
    pub state_id: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub on_failure: FailurePolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            api_url: DEFAULT_API_URL.to_string(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            season_id: DEFAULT_SEASON_ID,
            state_id: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            on_failure: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: String,
    /// Directory served for paths that match no API route.
    pub static_dir: PathBuf,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            static_dir: PathBuf::from("."),
        }
    }
}

impl ProxyConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|e| ConfigError::invalid("proxy.bind", format!("'{}': {}", self.bind, e)))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            console_timestamps: false,
        }
    }
}

impl LoggingConfig {
    pub fn min_level(&self) -> Result<LogLevel, ConfigError> {
        self.level
            .parse()
            .map_err(|e: String| ConfigError::invalid("logging.level", e))
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub source: SourceConfig,
    pub fields: FieldMapping,
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
}

impl DashboardConfig {
    /// Loads `path` (or the default path), applies environment overrides and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `PPS_*` overrides. `lookup` is `std::env::var` in production
    /// and a map in tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup("PPS_SOURCE") {
            self.source.kind = kind
                .parse()
                .map_err(|e: String| ConfigError::invalid("PPS_SOURCE", e))?;
        }
        if let Some(url) = lookup("PPS_API_URL") {
            self.source.api_url = url;
        }
        if let Some(url) = lookup("PPS_RELAY_URL") {
            self.source.relay_url = url;
        }
        if let Some(season) = lookup("PPS_SEASON_ID") {
            self.source.season_id = season
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid("PPS_SEASON_ID", format!("'{}': {}", season, e)))?;
        }
        if let Some(policy) = lookup("PPS_ON_FAILURE") {
            self.source.on_failure = policy
                .parse()
                .map_err(|e: String| ConfigError::invalid("PPS_ON_FAILURE", e))?;
        }
        if let Some(bind) = lookup("PPS_BIND") {
            self.proxy.bind = bind;
        }
        if let Some(level) = lookup("PPS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(file) = lookup("PPS_LOG_FILE") {
            self.logging.file = if file.trim().is_empty() { None } else { Some(file) };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::invalid("source.timeout_secs", "must be greater than 0"));
        }
        if self.source.kind == SourceKind::Direct && self.source.api_url.trim().is_empty() {
            return Err(ConfigError::invalid("source.api_url", "must not be empty"));
        }
        if self.source.kind == SourceKind::Relay && self.source.relay_url.trim().is_empty() {
            return Err(ConfigError::invalid("source.relay_url", "must not be empty"));
        }
        for (key, value) in [
            ("fields.state", &self.fields.state),
            ("fields.victims", &self.fields.victims),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(key, "must not be empty"));
            }
        }
        self.proxy.bind_addr()?;
        self.logging.min_level()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_point_at_jkm_api() {
        let config = DashboardConfig::default();
        assert_eq!(config.source.kind, SourceKind::Direct);
        assert_eq!(config.source.api_url, DEFAULT_API_URL);
        assert_eq!(config.source.season_id, 208);
        assert_eq!(config.source.timeout_secs, 10);
        assert_eq!(config.source.on_failure, FailurePolicy::Error);
        assert_eq!(config.fields, FieldMapping::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_keys() {
        let file = write_config(
            r#"
            [source]
            kind = "relay"
            on_failure = "sample"

            [fields]
            state = "state_name"

            [proxy]
            bind = "127.0.0.1:8080"
            "#,
        );
        let config = DashboardConfig::from_file(file.path()).expect("config should parse");
        assert_eq!(config.source.kind, SourceKind::Relay);
        assert_eq!(config.source.on_failure, FailurePolicy::Sample);
        assert_eq!(config.source.relay_url, DEFAULT_RELAY_URL);
        assert_eq!(config.fields.state, "state_name");
        assert_eq!(config.fields.victims, "jumlah_mangsa");
        assert_eq!(config.proxy.bind_addr().unwrap().port(), 8080);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let file = write_config("[source\nkind = ");
        let err = DashboardConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {:?}", err);
    }

    #[test]
    fn test_unknown_source_kind_is_rejected() {
        let file = write_config("[source]\nkind = \"carrier-pigeon\"\n");
        assert!(DashboardConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = DashboardConfig::load(Some(&dir.path().join("absent.toml")))
            .expect("missing file is not an error");
        assert_eq!(config.source.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let mut config = DashboardConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("PPS_SOURCE", "sample"),
                ("PPS_SEASON_ID", " 215 "),
                ("PPS_BIND", "127.0.0.1:9000"),
                ("PPS_LOG_FILE", "proxy.log"),
                ("PPS_ON_FAILURE", "sample"),
            ]))
            .expect("overrides should apply");
        assert_eq!(config.source.kind, SourceKind::Sample);
        assert_eq!(config.source.season_id, 215);
        assert_eq!(config.proxy.bind, "127.0.0.1:9000");
        assert_eq!(config.logging.file.as_deref(), Some("proxy.log"));
        assert_eq!(config.source.on_failure, FailurePolicy::Sample);
    }

    #[test]
    fn test_bad_env_override_is_reported_with_key() {
        let mut config = DashboardConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[("PPS_SEASON_ID", "latest")]))
            .unwrap_err();
        assert!(err.to_string().contains("PPS_SEASON_ID"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DashboardConfig::default();
        config.source.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.proxy.bind = "not-an-address".to_string();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.fields.victims = " ".to_string();
        assert!(config.validate().is_err());
    }
}
