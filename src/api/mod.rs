//! Gateway-facing surface: event envelopes, function handlers and the HTTP server

pub mod gateway;
pub mod handlers;
pub mod server;

pub use gateway::{GatewayEvent, GatewayResponse};
pub use handlers::{ApiHandlers, Function};
pub use server::{router, ApiServer};
