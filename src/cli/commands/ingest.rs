//! `ingest-nutrition`: spreadsheets into the nutrition index

use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::app::Services;
use crate::config::IndexBackend;
use crate::nutrition::{ingest_file, FoodCategory};

pub async fn run_ingest(services: Services, files: Vec<PathBuf>, category: FoodCategory) -> Result<()> {
    if services.config.nutrition.index == IndexBackend::Memory {
        warn!("The memory index does not outlive this process; configure nutrition.index = \"opensearch\" to keep the data");
    }
    for path in &files {
        let report = ingest_file(
            path,
            category,
            services.index.as_ref(),
            services.model.as_ref(),
        )
        .await?;
        info!(
            "{}: {} rows, {} indexed, {} skipped, {} without embedding",
            path.display(),
            report.rows,
            report.indexed,
            report.skipped,
            report.without_embedding
        );
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}
