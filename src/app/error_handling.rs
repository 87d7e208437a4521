//! Error handling utilities

use tracing::error;

/// Exit code for configuration and argument problems
const CONFIG_ERROR: i32 = 2;
const GENERAL_ERROR: i32 = 1;

/// Handle fatal errors and exit with appropriate status code
///
/// `ChefError`s print their user message; the full chain follows with `-v`.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    use crate::error::ChefError;

    error!("Fatal error: {:#}", error);

    let exit_code = if let Some(chef_err) = error.downcast_ref::<ChefError>() {
        eprintln!("Error: {}", chef_err.user_message());
        match chef_err {
            ChefError::Config(_) | ChefError::MissingField(_) => CONFIG_ERROR,
            _ => GENERAL_ERROR,
        }
    } else {
        eprintln!("Error: {error}");
        GENERAL_ERROR
    };

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code)
}
