use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

use crate::{
    api::ApiClient,
    infra::{
        self, config::FileConfigAdapter, contracts::ConfigAdapter,
        storage_layout::StorageLayout,
    },
    usecases::context::AppContext,
};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext> {
    let mut context = build_context(&FileConfigAdapter::new(config_path))?;

    let layout = StorageLayout::resolve()?;
    layout.ensure_dirs()?;
    context.log_guard = Some(infra::logging::init(
        &context.config.logging,
        &layout.log_dir,
    )?);

    tracing::info!(
        base_url = %context.api.base_url(),
        has_token = context.config.server.token.is_some(),
        log_dir = %layout.log_dir.display(),
        "bootstrap complete"
    );

    Ok(context)
}

fn build_context(config_adapter: &dyn ConfigAdapter) -> Result<AppContext> {
    let config = config_adapter.load()?;
    let api = ApiClient::new(&config.server.base_url, config.server.token.clone())
        .context("failed to build REST client")?;

    Ok(AppContext::new(config, Arc::new(api), None))
}
