mod adapter;
mod app_config;
mod file_config;
mod loader;

pub use adapter::FileConfigAdapter;
pub use app_config::{
    AppConfig, DisplayConfig, LogConfig, ReconnectMode, ServerConfig, SyncConfig,
};
pub use loader::{load, TOKEN_ENV_VAR};
