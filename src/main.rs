use ai_chef::app::handle_fatal_error;
use ai_chef::cli::{execute_command, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = execute_command(cli).await {
        handle_fatal_error(e, verbose);
    }
}
