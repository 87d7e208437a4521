//! Session lifecycle: creation, profile handling, status tracking and results

pub mod profile;
pub mod service;
pub mod tracker;

pub use profile::{Profile, Target};
pub use service::{
    phase_message, CreatedSession, ProcessRequest, ProcessStarted, ResultView, SessionService,
    SessionStatusView,
};
pub use tracker::{truncate_error, StatusTracker};
