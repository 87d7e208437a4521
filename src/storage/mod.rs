//! Document store for session and result records
//!
//! Sessions are mutated by every pipeline stage through partial updates;
//! result records hold one stage output each (`<sessionId>_recipe`,
//! `<sessionId>_price`, `<sessionId>_image`).

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod traits;
pub mod types;

pub use backends::{FileStore, MemoryStore};
pub use config::{BackendType, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use traits::DocumentStore;
pub use types::{ResultRecord, ResultType, SessionRecord, SessionStatus, SessionUpdate};
