//! reborn-semantic
//!
//! Local semantic search: embeddings from `reborn-embed` in an exhaustive
//! flat-L2 index per record class, persisted next to a JSON record list.
pub mod arena;
pub mod engine;
pub mod persist;

pub use arena::{Handle, VectorArena};
pub use engine::LocalSemanticEngine;
