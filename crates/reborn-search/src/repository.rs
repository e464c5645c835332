use serde::Serialize;
use std::sync::Arc;

use reborn_core::config::SearchSettings;
use reborn_core::{
    Error, HybridHits, IndexedRecord, RecordClass, Result, ScoredResult, SearchBackend, SearchMode,
};
use reborn_embed::EmbeddingProvider;
use reborn_hybrid::{HybridEngine, HybridWeights};
use reborn_keyword::TantivyKeywordEngine;
use reborn_semantic::LocalSemanticEngine;
use reborn_vector::LanceSemanticEngine;

/// Result of [`SearchRepository::search`], shaped by the search mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Ranked(Vec<ScoredResult>),
    Fused(HybridHits),
}

impl SearchResponse {
    pub fn len(&self) -> usize {
        match self {
            SearchResponse::Ranked(hits) => hits.len(),
            SearchResponse::Fused(hits) => hits.results.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Entry point of the search subsystem for the rest of the application.
///
/// The semantic backend (local index or vector database) and the optional
/// keyword backend are chosen once, at construction. Every engine failure
/// comes back as [`Error::SearchEngine`].
pub struct SearchRepository {
    semantic: Arc<dyn SearchBackend>,
    keyword: Option<Arc<dyn SearchBackend>>,
    hybrid: HybridEngine,
}

impl SearchRepository {
    pub fn from_settings(settings: &SearchSettings) -> Result<Self> {
        let provider = EmbeddingProvider::from_settings(&settings.embedding)
            .map_err(|e| Error::search_engine("load the embedding model", e))?;
        Ok(Self::with_provider(settings, Arc::new(provider)))
    }

    /// Build the configured backends around an existing embedding provider.
    pub fn with_provider(settings: &SearchSettings, provider: Arc<EmbeddingProvider>) -> Self {
        let semantic: Arc<dyn SearchBackend> = if settings.use_vector_db {
            Arc::new(LanceSemanticEngine::from_settings(provider, settings))
        } else {
            Arc::new(LocalSemanticEngine::from_settings(provider, settings))
        };
        let keyword: Option<Arc<dyn SearchBackend>> = if settings.keyword_enabled {
            Some(Arc::new(TantivyKeywordEngine::from_settings(settings)))
        } else {
            None
        };
        tracing::info!(
            semantic = semantic.name(),
            keyword = ?keyword.as_ref().map(|k| k.name()),
            "search repository ready"
        );
        let weights = HybridWeights::new(settings.weight_semantic, settings.weight_keyword);
        Self::new(semantic, keyword, weights)
    }

    pub fn new(
        semantic: Arc<dyn SearchBackend>,
        keyword: Option<Arc<dyn SearchBackend>>,
        weights: HybridWeights,
    ) -> Self {
        let hybrid = HybridEngine::new(semantic.clone(), keyword.clone(), weights);
        Self { semantic, keyword, hybrid }
    }

    pub fn semantic_backend(&self) -> &str { self.semantic.name() }

    pub fn has_keyword_backend(&self) -> bool { self.keyword.is_some() }

    pub fn semantic_search_articles(&self, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
        self.semantic_search(RecordClass::Article, query, k)
    }

    pub fn semantic_search_statements(&self, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
        self.semantic_search(RecordClass::Statement, query, k)
    }

    pub fn keyword_search_articles(&self, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
        self.keyword_search(RecordClass::Article, query, k)
    }

    pub fn keyword_search_statements(&self, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
        self.keyword_search(RecordClass::Statement, query, k)
    }

    pub fn hybrid_search_articles(&self, query: &str, k: usize) -> Result<HybridHits> {
        self.hybrid_search(RecordClass::Article, query, k)
    }

    pub fn hybrid_search_statements(&self, query: &str, k: usize) -> Result<HybridHits> {
        self.hybrid_search(RecordClass::Statement, query, k)
    }

    pub fn add_articles(&self, records: &[IndexedRecord]) -> Result<bool> {
        self.add(RecordClass::Article, records)
    }

    pub fn add_statements(&self, records: &[IndexedRecord]) -> Result<bool> {
        self.add(RecordClass::Statement, records)
    }

    pub fn semantic_search(
        &self,
        class: RecordClass,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredResult>> {
        self.semantic
            .search(class, query, k)
            .map_err(|e| failed(format!("perform semantic search on {class}"), e))
    }

    /// Empty when no keyword backend is configured.
    pub fn keyword_search(
        &self,
        class: RecordClass,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredResult>> {
        let Some(keyword) = &self.keyword else { return Ok(Vec::new()) };
        keyword
            .search(class, query, k)
            .map_err(|e| failed(format!("perform keyword search on {class}"), e))
    }

    pub fn hybrid_search(&self, class: RecordClass, query: &str, k: usize) -> Result<HybridHits> {
        self.hybrid
            .search(class, query, k)
            .map_err(|e| failed(format!("perform hybrid search on {class}"), e))
    }

    pub fn search(
        &self,
        mode: SearchMode,
        class: RecordClass,
        query: &str,
        k: usize,
    ) -> Result<SearchResponse> {
        Ok(match mode {
            SearchMode::Semantic => SearchResponse::Ranked(self.semantic_search(class, query, k)?),
            SearchMode::Keyword => SearchResponse::Ranked(self.keyword_search(class, query, k)?),
            SearchMode::Hybrid => SearchResponse::Fused(self.hybrid_search(class, query, k)?),
        })
    }

    /// Index `records` in every active backend.
    pub fn add(&self, class: RecordClass, records: &[IndexedRecord]) -> Result<bool> {
        let op = || format!("add {class} to search index");
        self.semantic.add(class, records).map_err(|e| failed(op(), e))?;
        if let Some(keyword) = &self.keyword {
            keyword.add(class, records).map_err(|e| failed(op(), e))?;
        }
        Ok(true)
    }

    pub fn delete_indices(&self) -> Result<bool> {
        let op = "delete search indices";
        self.semantic.delete_indices().map_err(|e| failed(op, e))?;
        if let Some(keyword) = &self.keyword {
            keyword.delete_indices().map_err(|e| failed(op, e))?;
        }
        Ok(true)
    }
}

fn failed(operation: impl Into<String>, source: anyhow::Error) -> Error {
    let operation = operation.into();
    tracing::error!(%operation, error = %format!("{source:#}"), "search engine failure");
    Error::search_engine(operation, source)
}
