//! `purge`: drop expired records

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::app::Services;

pub async fn run_purge(services: Services) -> Result<()> {
    let removed = services.store.purge_expired(Utc::now()).await?;
    info!("Purged {} expired records", removed);
    println!("{removed}");
    Ok(())
}
