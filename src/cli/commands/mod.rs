//! Command implementations

pub mod ingest;
pub mod invoke;
pub mod purge;
pub mod serve;

pub use ingest::run_ingest;
pub use invoke::{read_event, response_json, run_invoke};
pub use purge::run_purge;
pub use serve::run_serve;
