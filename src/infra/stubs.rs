use anyhow::Result;

use crate::infra::{config::AppConfig, contracts::ConfigAdapter};

/// Config source returning a fixed config, for wiring tests.
#[derive(Debug, Clone, Default)]
pub struct StubConfigAdapter {
    pub config: AppConfig,
}

impl ConfigAdapter for StubConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_config_returns_configured_value() {
        let mut config = AppConfig::default();
        config.server.base_url = "https://split.example".to_owned();
        let adapter = StubConfigAdapter {
            config: config.clone(),
        };

        assert_eq!(adapter.load().expect("stub config must load"), config);
    }
}
