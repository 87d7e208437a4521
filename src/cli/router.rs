//! Command routing and execution

use anyhow::Result;

use crate::app::{build_services, initialize_app, AppConfig};
use crate::cli::args::{Cli, Commands};
use crate::cli::commands::{run_ingest, run_invoke, run_purge, run_serve};

/// Initialize the application and run the parsed command
pub async fn execute_command(cli: Cli) -> Result<()> {
    let app_config = AppConfig::new(cli.verbose).with_config_path(cli.config);
    let config = initialize_app(&app_config).await?;
    let services = build_services(config).await?;

    match cli.command {
        Commands::Serve { bind } => run_serve(services, bind).await,
        Commands::Invoke { function, event } => run_invoke(services, function, &event).await,
        Commands::IngestNutrition { files, category } => {
            run_ingest(services, files, category).await
        }
        Commands::Purge => run_purge(services).await,
    }
}
