//! エンジン設定（TOML）
//!
//! # 例
//!
//! ```toml
//! [gc]
//! interval_secs = 3600
//! audit_dir = "/var/lib/pinwarden/audit"
//!
//! [reminder]
//! window_days = 7
//! subject = "Your pins are about to expire"
//!
//! [pin]
//! network = "public"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DEFAULT_NETWORK;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub gc: GcConfig,

    #[serde(default)]
    pub reminder: ReminderConfig,

    #[serde(default)]
    pub pin: PinConfig,
}

/// スケジューラループの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GcConfig {
    /// 回収 tick の間隔（秒）
    /// デフォルト: 3600
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// audit ファイルの出力先
    /// デフォルト: カレントディレクトリ
    #[serde(default = "default_audit_dir")]
    pub audit_dir: PathBuf,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            audit_dir: default_audit_dir(),
        }
    }
}

impl GcConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReminderConfig {
    /// 期限切れ予告で先読みする日数
    /// デフォルト: 7
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            subject: default_subject(),
        }
    }
}

fn default_window_days() -> u32 {
    7
}

fn default_subject() -> String {
    "Pin expiration reminder".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinConfig {
    /// refund / 登録で使うネットワークタグ
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
        }
    }
}

fn default_network() -> String {
    DEFAULT_NETWORK.to_string()
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// `path` から読み込む。`None` ならデフォルト
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gc.interval_secs == 0 {
            return Err(ConfigError::Invalid("gc.interval_secs must be > 0".into()));
        }
        if self.pin.network.trim().is_empty() {
            return Err(ConfigError::Invalid("pin.network must not be empty".into()));
        }
        Ok(())
    }
}
