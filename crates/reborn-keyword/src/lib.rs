//! reborn-keyword
//!
//! Keyword search over tantivy: one index per record class, id-keyed upserts,
//! and exact-or-fuzzy matching across the primary and abstract fields.
pub mod engine;
pub mod index;
pub mod query;
pub mod tantivy_utils;

pub use engine::TantivyKeywordEngine;
pub use index::ClassIndex;
