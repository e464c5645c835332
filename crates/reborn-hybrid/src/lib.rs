//! reborn-hybrid
//!
//! Weighted fusion of semantic and keyword results.
pub mod engine;
pub mod fusion;

pub use engine::HybridEngine;
pub use fusion::{fuse, normalize, HybridWeights};
