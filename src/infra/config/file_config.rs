use serde::Deserialize;

use crate::infra::config::{
    AppConfig, DisplayConfig, LogConfig, ReconnectMode, ServerConfig, SyncConfig,
};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub server: Option<FileServerConfig>,
    pub sync: Option<FileSyncConfig>,
    pub display: Option<FileDisplayConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(server) = self.server {
            server.merge_into(&mut config.server);
        }

        if let Some(sync) = self.sync {
            sync.merge_into(&mut config.sync);
        }

        if let Some(display) = self.display {
            display.merge_into(&mut config.display);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }
    }
}

#[derive(Deserialize, Default)]
pub struct FileServerConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

impl FileServerConfig {
    fn merge_into(self, config: &mut ServerConfig) {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        if let Some(token) = self.token {
            config.token = Some(token);
        }
    }
}

impl std::fmt::Debug for FileServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileServerConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSyncConfig {
    pub poll_interval_ms: Option<u64>,
    pub reconnect: Option<ReconnectMode>,
    pub reconnect_delay_ms: Option<u64>,
    pub typing_ttl_ms: Option<u64>,
    pub typing_throttle_ms: Option<u64>,
    pub refresh_interval_ms: Option<u64>,
}

impl FileSyncConfig {
    fn merge_into(self, config: &mut SyncConfig) {
        if let Some(value) = self.poll_interval_ms {
            config.poll_interval_ms = value;
        }

        if let Some(mode) = self.reconnect {
            config.reconnect = mode;
        }

        if let Some(value) = self.reconnect_delay_ms {
            config.reconnect_delay_ms = value;
        }

        if let Some(value) = self.typing_ttl_ms {
            config.typing_ttl_ms = value;
        }

        if let Some(value) = self.typing_throttle_ms {
            config.typing_throttle_ms = value;
        }

        if let Some(value) = self.refresh_interval_ms {
            config.refresh_interval_ms = value;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileDisplayConfig {
    pub utc_offset_minutes: Option<i32>,
}

impl FileDisplayConfig {
    fn merge_into(self, config: &mut DisplayConfig) {
        if let Some(minutes) = self.utc_offset_minutes {
            config.utc_offset_minutes = minutes;
        }
    }
}
