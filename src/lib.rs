//! # ai-chef
//!
//! A recipe pipeline: a user's dietary profile becomes a recipe generated by a
//! hosted model, priced ingredient by ingredient through a shopping search
//! API, annotated with nutrition facts, and combined into one result per
//! session.
//!
//! ## Usage
//!
//! ```bash
//! ai-chef serve
//! ai-chef invoke process --event event.json
//! ai-chef ingest-nutrition foods.csv --category standard
//! ```
//!
//! ## Modules
//!
//! - `abstractions` - Trait seams for the model, HTTP APIs, secrets and the workflow engine
//! - `api` - Gateway events, function handlers and the HTTP server
//! - `combine` - Stage payload unwrapping and the combined result
//! - `config` - Service configuration
//! - `nutrition` - Unit conversion, nutrition index lookups and target compliance
//! - `pipeline` - Recipe, price, nutrition and combine stages and the local engine
//! - `pricing` - Shopping search client, ranking and vendor grouping
//! - `recipe` - Prompts, model reply parsing and default recipes
//! - `session` - Session lifecycle and status tracking
//! - `storage` - Document store for session and result records
pub mod abstractions;
pub mod api;
pub mod app;
pub mod cli;
pub mod combine;
pub mod config;
pub mod error;
pub mod nutrition;
pub mod pipeline;
pub mod pricing;
pub mod recipe;
pub mod session;
pub mod storage;

pub use error::{ChefError, Result};
