//! `serve`: the HTTP API

use anyhow::Result;
use tracing::info;

use crate::api::ApiServer;
use crate::app::Services;

pub async fn run_serve(services: Services, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| services.config.server.bind.clone());
    info!(
        "Serving with {:?} storage and {:?} nutrition index",
        services.config.storage.backend, services.config.nutrition.index
    );
    ApiServer::new(services.handlers.clone(), bind).start().await
}
