//! Layered configuration
//!
//! 1. Built-in defaults
//! 2. Host/user config (`~/.config/doorflow/field.toml`, or `--config`)
//! 3. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{
    default_host_config_path, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, RedactedConfig,
};
pub use merge::{deep_merge, merge_layers};
pub use settings::{
    ApiSettings, CaptureSettings, FieldSettings, LogFormat, LogSettings, StoreSettings, SyncSettings,
};
