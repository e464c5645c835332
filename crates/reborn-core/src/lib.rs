//! reborn-core
//!
//! Record model, engine traits, availability wrapper, domain error and
//! configuration shared by every search crate in the workspace.

pub mod availability;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use availability::Availability;
pub use error::{Error, Result};
pub use traits::{Embedder, SearchBackend};
pub use types::{FusedResult, HybridHits, IndexedRecord, RecordClass, ScoredResult, SearchMode};
