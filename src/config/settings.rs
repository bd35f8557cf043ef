//! Typed view of the merged configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::HttpConfig;
use crate::session::SessionConfig;

/// `[api]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

/// `[store]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Device store root; the platform data directory when unset
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// `[capture]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub max_offline_photo_bytes: u64,
    pub signature_width: u32,
    pub signature_height: u32,
    pub signature_pen_width: f32,
}

/// `[sync]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    pub probe_interval_seconds: u64,
    pub tick_interval_ms: u64,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// `[log]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

/// All settings the CLI and library consume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSettings {
    pub api: ApiSettings,
    #[serde(default)]
    pub store: StoreSettings,
    pub capture: CaptureSettings,
    pub sync: SyncSettings,
    pub log: LogSettings,
}

impl FieldSettings {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            base_url: self.api.base_url.clone(),
            token: self.api.token.clone(),
            timeout_seconds: self.api.timeout_seconds,
            connect_timeout_seconds: self.api.connect_timeout_seconds,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_offline_photo_bytes: self.capture.max_offline_photo_bytes as usize,
            tick_interval: Duration::from_millis(self.sync.tick_interval_ms),
        }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.sync.probe_interval_seconds)
    }

    /// Configured store root, else `$XDG_DATA_HOME/doorflow/field`, else
    /// `~/.local/share/doorflow/field`
    pub fn store_root(&self) -> PathBuf {
        if let Some(root) = &self.store.root {
            return root.clone();
        }
        if let Some(data) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(data).join("doorflow/field");
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".local/share/doorflow/field"),
            None => PathBuf::from(".doorflow/field"),
        }
    }
}
