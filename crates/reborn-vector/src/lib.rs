//! reborn-vector
//!
//! Vector-database semantic search on lancedb: one collection per record
//! class, id-keyed upserts, server-side nearest-neighbour queries.
pub mod engine;
pub mod schema;
pub mod table;

pub use engine::LanceSemanticEngine;
