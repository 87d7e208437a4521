//! Pipeline stages and the in-process engine that sequences them

pub mod local;
pub mod stages;

pub use local::LocalWorkflowEngine;
pub use stages::{ingredient_list, phase, require_session_id, StageHandlers};
