//! Built-in defaults (layer 1)
//!
//! Hardcoded defaults for all configuration values.

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Backend base URL
    pub api_base_url: String,

    /// Request timeout in seconds (default: 30)
    pub api_timeout_seconds: u64,

    /// Connection timeout in seconds (default: 5)
    pub api_connect_timeout_seconds: u64,

    /// Largest photo kept on the device while offline (default: 8 MiB)
    pub max_offline_photo_bytes: u64,

    /// Signature canvas size in pixels
    pub signature_width: u32,
    pub signature_height: u32,

    /// Pen width in pixels (default: 2.5)
    pub signature_pen_width: f64,

    /// Connectivity probe interval for `watch` (default: 15)
    pub probe_interval_seconds: u64,

    /// Elapsed ticker refresh in milliseconds (default: 1000)
    pub tick_interval_ms: u64,

    /// Log filter (default: "info")
    pub log_level: String,

    /// Log output format, "text" or "json"
    pub log_format: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            api_timeout_seconds: 30,
            api_connect_timeout_seconds: 5,
            max_offline_photo_bytes: 8 * 1024 * 1024,
            signature_width: 600,
            signature_height: 200,
            signature_pen_width: 2.5,
            probe_interval_seconds: 15,
            tick_interval_ms: 1000,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "api": {
                "base_url": self.api_base_url,
                "timeout_seconds": self.api_timeout_seconds,
                "connect_timeout_seconds": self.api_connect_timeout_seconds
            },
            "store": {},
            "capture": {
                "max_offline_photo_bytes": self.max_offline_photo_bytes,
                "signature_width": self.signature_width,
                "signature_height": self.signature_height,
                "signature_pen_width": self.signature_pen_width
            },
            "sync": {
                "probe_interval_seconds": self.probe_interval_seconds,
                "tick_interval_ms": self.tick_interval_ms
            },
            "log": {
                "level": self.log_level,
                "format": self.log_format
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.api_timeout_seconds, 30);
        assert_eq!(defaults.max_offline_photo_bytes, 8 * 1024 * 1024);
        assert_eq!(defaults.log_format, "text");
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["api"]["connect_timeout_seconds"], 5);
        assert_eq!(value["sync"]["probe_interval_seconds"], 15);
        assert_eq!(value["capture"]["signature_width"], 600);
        assert!(value["api"].get("token").is_none());
    }
}
