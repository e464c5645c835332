use anyhow::Result;
use std::sync::Arc;

use reborn_core::{HybridHits, RecordClass, SearchBackend};

use crate::fusion::{fuse, HybridWeights};

/// Runs the semantic engine and, when configured, the keyword engine, then
/// fuses their hits. Works with any [`SearchBackend`] pair.
pub struct HybridEngine {
    semantic: Arc<dyn SearchBackend>,
    keyword: Option<Arc<dyn SearchBackend>>,
    weights: HybridWeights,
}

impl HybridEngine {
    pub fn new(
        semantic: Arc<dyn SearchBackend>,
        keyword: Option<Arc<dyn SearchBackend>>,
        weights: HybridWeights,
    ) -> Self {
        let weights = HybridWeights::new(weights.semantic, weights.keyword);
        Self { semantic, keyword, weights }
    }

    pub fn weights(&self) -> HybridWeights { self.weights }

    pub fn search(&self, class: RecordClass, query: &str, k: usize) -> Result<HybridHits> {
        let semantic = self.semantic.search(class, query, k).inspect_err(|e| {
            tracing::error!(
                %class,
                backend = self.semantic.name(),
                error = %format!("{e:#}"),
                "hybrid semantic leg failed"
            );
        })?;
        let keyword = match &self.keyword {
            Some(engine) => Some(engine.search(class, query, k).inspect_err(|e| {
                tracing::error!(
                    %class,
                    backend = engine.name(),
                    error = %format!("{e:#}"),
                    "hybrid keyword leg failed"
                );
            })?),
            None => None,
        };
        let (n_semantic, n_keyword) = (semantic.len(), keyword.as_ref().map_or(0, Vec::len));
        let hits = fuse(class, semantic, keyword, self.weights);
        tracing::debug!(%class, n_semantic, n_keyword, kept = hits.results.len(), "hybrid search");
        Ok(hits)
    }

    pub fn search_articles(&self, query: &str, k: usize) -> Result<HybridHits> {
        self.search(RecordClass::Article, query, k)
    }

    pub fn search_statements(&self, query: &str, k: usize) -> Result<HybridHits> {
        self.search(RecordClass::Statement, query, k)
    }
}
