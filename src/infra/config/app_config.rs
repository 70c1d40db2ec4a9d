use std::{fmt, time::Duration};

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::{
    coordinator::{SyncSettings, DEFAULT_UTC_OFFSET_MINUTES},
    transport::ReconnectPolicy,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub display: DisplayConfig,
}

impl AppConfig {
    /// Sync core settings derived from the `[sync]` and `[display]` sections.
    /// Values are validated by the loader; an out-of-range offset falls back to UTC.
    pub fn sync_settings(&self) -> SyncSettings {
        let reconnect = match self.sync.reconnect {
            ReconnectMode::Always => ReconnectPolicy::Always {
                delay: Duration::from_millis(self.sync.reconnect_delay_ms),
            },
            ReconnectMode::Once => ReconnectPolicy::Once,
        };

        SyncSettings {
            poll_interval: Duration::from_millis(self.sync.poll_interval_ms),
            reconnect,
            typing_ttl: Duration::from_millis(self.sync.typing_ttl_ms),
            typing_throttle: Duration::from_millis(self.sync.typing_throttle_ms),
            refresh_interval: Duration::from_millis(self.sync.refresh_interval_ms),
            display_offset: self.display.offset(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            token: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectMode {
    #[default]
    Always,
    Once,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval_ms: u64,
    pub reconnect: ReconnectMode,
    pub reconnect_delay_ms: u64,
    pub typing_ttl_ms: u64,
    pub typing_throttle_ms: u64,
    pub refresh_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            reconnect: ReconnectMode::Always,
            reconnect_delay_ms: 3_000,
            typing_ttl_ms: 3_000,
            typing_throttle_ms: 1_000,
            refresh_interval_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayConfig {
    pub utc_offset_minutes: i32,
}

impl DisplayConfig {
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}
