//! Application module
//!
//! Process-level concerns: command-line configuration, logging setup, fatal
//! error reporting and wiring the services from configuration.

pub mod config;
pub mod error_handling;
pub mod logging;
pub mod runtime;

pub use config::AppConfig;
pub use error_handling::handle_fatal_error;
pub use logging::init_logging;
pub use runtime::{assemble, build_services, initialize_app, Services};
