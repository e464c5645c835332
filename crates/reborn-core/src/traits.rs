use crate::types::{IndexedRecord, RecordClass, ScoredResult};

/// Text-to-vector model.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// One vector per input text, in input order.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Capability shared by every search backend (keyword, local semantic,
/// vector database). The hybrid engine and the repository only see this.
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// False when the backend degraded to disabled at construction.
    fn is_available(&self) -> bool { true }

    /// Index the valid subset of `records`; returns how many were indexed.
    fn add(&self, class: RecordClass, records: &[IndexedRecord]) -> anyhow::Result<usize>;

    /// Top `k` results for `query`; `k == 0` selects the default.
    fn search(
        &self,
        class: RecordClass,
        query: &str,
        k: usize,
    ) -> anyhow::Result<Vec<ScoredResult>>;

    /// Drop persisted and in-memory state for both record classes.
    fn delete_indices(&self) -> anyhow::Result<()>;

    fn add_articles(&self, records: &[IndexedRecord]) -> anyhow::Result<usize> {
        self.add(RecordClass::Article, records)
    }

    fn add_statements(&self, records: &[IndexedRecord]) -> anyhow::Result<usize> {
        self.add(RecordClass::Statement, records)
    }

    fn search_articles(&self, query: &str, k: usize) -> anyhow::Result<Vec<ScoredResult>> {
        self.search(RecordClass::Article, query, k)
    }

    fn search_statements(&self, query: &str, k: usize) -> anyhow::Result<Vec<ScoredResult>> {
        self.search(RecordClass::Statement, query, k)
    }
}
