//! Effective configuration with provenance
//!
//! The merged configuration plus where each layer came from. Secrets stay
//! usable in `config`; `redacted()` produces the form that is safe to print.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use super::settings::FieldSettings;
use crate::capture::MAX_CANVAS_SIDE;

pub const SCHEMA_VERSION: u32 = 1;

pub const SCHEMA_ID: &str = "doorflow-field/effective_config@1";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

/// Redacted rendering of an `EffectiveConfig`
#[derive(Debug, Clone, Serialize)]
pub struct RedactedConfig {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub config: Value,
    pub sources: Vec<ConfigSource>,
    /// Key paths whose values were replaced
    pub redactions: Vec<String>,
}

/// Keys that contain secrets and are hidden on display
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "api_key", "credential"];

const REDACTED: &str = "[REDACTED]";

/// `$XDG_CONFIG_HOME/doorflow/field.toml`, else `~/.config/doorflow/field.toml`
pub fn default_host_config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir).join("doorflow/field.toml"));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/doorflow/field.toml"))
}

impl EffectiveConfig {
    /// Build from layers. A host file that does not exist is skipped.
    pub fn build(host_config_path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        if let Some(path) = host_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Host,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        Self::validate_config(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
        })
    }

    /// Build for the CLI: an explicit `--config` file must exist, otherwise
    /// the default host path is used when present.
    pub fn load(explicit: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::IoError(format!("config file not found: {}", path.display())));
                }
                Self::build(Some(path), cli_overrides)
            }
            None => {
                let host = default_host_config_path();
                Self::build(host.as_deref(), cli_overrides)
            }
        }
    }

    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents =
            String::from_utf8(bytes).map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
        let toml_value: toml::Value =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }

    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        let base_url = config.pointer("/api/base_url").and_then(Value::as_str).unwrap_or("");
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(
                "api.base_url must be an http(s) URL".to_string(),
            ));
        }

        let timeout = config.pointer("/api/timeout_seconds").and_then(Value::as_u64);
        if let Some(timeout) = timeout {
            if timeout == 0 || timeout > 600 {
                return Err(ConfigError::ValidationError(
                    "api.timeout_seconds must be in (0, 600]".to_string(),
                ));
            }
        }

        if let Some(connect) = config.pointer("/api/connect_timeout_seconds").and_then(Value::as_u64) {
            let limit = timeout.unwrap_or(300).min(300);
            if connect == 0 || connect > limit {
                return Err(ConfigError::ValidationError(format!(
                    "api.connect_timeout_seconds must be in (0, {}]",
                    limit
                )));
            }
        }

        for key in [
            "/capture/max_offline_photo_bytes",
            "/capture/signature_width",
            "/capture/signature_height",
            "/sync/probe_interval_seconds",
            "/sync/tick_interval_ms",
        ] {
            if config.pointer(key).and_then(Value::as_u64) == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than 0",
                    key.trim_start_matches('/').replace('/', ".")
                )));
            }
        }

        for key in ["/capture/signature_width", "/capture/signature_height"] {
            if let Some(side) = config.pointer(key).and_then(Value::as_u64) {
                if side > u64::from(MAX_CANVAS_SIDE) {
                    return Err(ConfigError::ValidationError(format!(
                        "{} must be at most {}",
                        key.trim_start_matches('/').replace('/', "."),
                        MAX_CANVAS_SIDE
                    )));
                }
            }
        }

        if let Some(format) = config.pointer("/log/format").and_then(Value::as_str) {
            if format != "text" && format != "json" {
                return Err(ConfigError::ValidationError(format!(
                    "log.format must be \"text\" or \"json\", got \"{}\"",
                    format
                )));
            }
        }

        Ok(())
    }

    /// Typed view
    pub fn settings(&self) -> Result<FieldSettings, ConfigError> {
        serde_json::from_value(self.config.clone()).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Copy with secret values replaced, for display
    pub fn redacted(&self) -> RedactedConfig {
        let mut config = self.config.clone();
        let mut redactions = Vec::new();
        redact_recursive(&mut config, String::new(), &mut redactions);
        RedactedConfig {
            schema_version: self.schema_version,
            schema_id: self.schema_id.clone(),
            created_at: self.created_at,
            config,
            sources: self.sources.clone(),
            redactions,
        }
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect()),
    }
}

fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let current_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                let key_lower = key.to_lowercase();
                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                if is_secret && !val.is_null() && !val.is_object() && !val.is_array() {
                    *val = Value::String(REDACTED.to_string());
                    redactions.push(current_path);
                } else {
                    redact_recursive(val, current_path, redactions);
                }
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter_mut().enumerate() {
                redact_recursive(val, format!("{}[{}]", path, i), redactions);
            }
        }
        _ => {}
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
