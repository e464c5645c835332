//! reborn-search
//!
//! Search repository facade: picks the semantic backend from configuration and
//! exposes keyword, semantic and hybrid search plus ingestion and reset.
pub mod repository;

pub use repository::{SearchRepository, SearchResponse};
