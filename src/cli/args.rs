//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::api::Function;
use crate::nutrition::FoodCategory;

/// Profile-driven recipes with ingredient prices and nutrition facts
#[derive(Parser)]
#[command(name = "ai-chef")]
#[command(about = "ai-chef - recipe generation pipeline with pricing and nutrition", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API with the in-process workflow engine
    Serve {
        /// Address to listen on, overriding server.bind
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Feed one JSON event to one function and print its response
    Invoke {
        /// Function to invoke
        #[arg(value_enum)]
        function: Function,

        /// File holding the event JSON ("-" reads stdin)
        #[arg(short, long, default_value = "-")]
        event: PathBuf,
    },

    /// Load nutrition spreadsheets (CSV) into the nutrition index
    #[command(name = "ingest-nutrition")]
    IngestNutrition {
        /// CSV files to load
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Food category recorded with every row
        #[arg(long, value_enum, default_value = "standard")]
        category: FoodCategory,
    },

    /// Remove expired sessions and results from the store
    Purge,
}
