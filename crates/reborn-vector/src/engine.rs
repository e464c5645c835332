use anyhow::{Context, Result};
use lancedb::Connection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Runtime;

use reborn_core::config::SearchSettings;
use reborn_core::types::{effective_k, DEFAULT_K};
use reborn_core::{Availability, IndexedRecord, RecordClass, ScoredResult, SearchBackend};
use reborn_embed::EmbeddingProvider;

use crate::schema::build_record_schema;
use crate::table;

/// Semantic search backed by one lancedb collection per record class.
///
/// lancedb is async; the engine owns a runtime and blocks on it so it can
/// sit behind the synchronous [`SearchBackend`] trait. It must not be called
/// from inside another tokio runtime.
pub struct LanceSemanticEngine {
    state: Availability<LanceStore>,
    provider: Arc<EmbeddingProvider>,
    batch_size: usize,
    default_k: usize,
}

struct LanceStore {
    rt: Runtime,
    conn: Connection,
    dim: i32,
}

impl LanceStore {
    fn connect(uri: &str, dim: i32) -> Result<Self> {
        let rt = Runtime::new()?;
        let conn = rt
            .block_on(table::open_db(uri))
            .with_context(|| format!("connecting to {uri}"))?;
        for class in RecordClass::ALL {
            let schema = build_record_schema(dim);
            rt.block_on(table::ensure_table(&conn, class.collection_name(), schema))
                .with_context(|| format!("creating collection {}", class.collection_name()))?;
        }
        Ok(Self { rt, conn, dim })
    }
}

impl LanceSemanticEngine {
    pub fn new(provider: Arc<EmbeddingProvider>, uri: &str) -> Self {
        let dim = i32::try_from(provider.dim()).unwrap_or(i32::MAX);
        tracing::debug!(uri, dim, "opening vector database");
        Self {
            state: Availability::probe("vector-db", LanceStore::connect(uri, dim)),
            provider,
            batch_size: 100,
            default_k: DEFAULT_K,
        }
    }

    pub fn from_settings(provider: Arc<EmbeddingProvider>, settings: &SearchSettings) -> Self {
        Self::new(provider, &settings.vector_db_uri())
            .with_batch_size(settings.vector_db_batch_size)
            .with_default_k(settings.default_k)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_default_k(mut self, default_k: usize) -> Self {
        self.default_k = default_k;
        self
    }

    /// Rows stored in the collection of `class`.
    pub fn count(&self, class: RecordClass) -> Result<usize> {
        let Some(store) = self.state.available() else { return Ok(0) };
        store.rt.block_on(table::count_rows(&store.conn, class.collection_name()))
    }
}

/// Keep the last occurrence of each id, in first-seen order.
fn dedup_by_id<'a>(class: RecordClass, records: Vec<&'a IndexedRecord>) -> Vec<&'a IndexedRecord> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<&IndexedRecord> = Vec::with_capacity(records.len());
    for record in records {
        let id = record.get_str(class.id_field()).unwrap_or_default();
        match position.get(id) {
            Some(&i) => out[i] = record,
            None => {
                position.insert(id, out.len());
                out.push(record);
            }
        }
    }
    out
}

impl SearchBackend for LanceSemanticEngine {
    fn name(&self) -> &str { "vector-db" }

    fn is_available(&self) -> bool { self.state.is_available() }

    fn add(&self, class: RecordClass, records: &[IndexedRecord]) -> Result<usize> {
        let Some(store) = self.state.available() else {
            tracing::debug!(%class, "vector database disabled, skipping add");
            return Ok(0);
        };
        let valid = dedup_by_id(class, class.select_valid(records));
        if valid.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = valid.iter().map(|r| class.composite_text(r)).collect();
        let vectors = self.provider.encode(&texts).with_context(|| format!("embedding {class}"))?;

        let name = class.collection_name();
        let batches = valid.chunks(self.batch_size).zip(vectors.chunks(self.batch_size));
        for (records, vectors) in batches {
            let batch = table::to_record_batch(class, records, vectors, store.dim)?;
            store
                .rt
                .block_on(table::upsert(&store.conn, name, batch))
                .with_context(|| format!("upserting into {name}"))?;
        }
        tracing::info!(%class, upserted = valid.len(), "vector database updated");
        Ok(valid.len())
    }

    fn search(&self, class: RecordClass, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
        let Some(store) = self.state.available() else {
            tracing::debug!(%class, "vector database disabled, empty result");
            return Ok(Vec::new());
        };
        let k = effective_k(k, self.default_k);
        let q = self.provider.encode_query(query).context("embedding query")?;
        let rows = store
            .rt
            .block_on(table::nearest(&store.conn, class.collection_name(), q, k))
            .with_context(|| format!("querying {}", class.collection_name()))?;

        // The database order is the ranking; scores are synthesised from rank.
        let count = rows.len() as f32;
        let hits = rows
            .into_iter()
            .enumerate()
            .map(|(rank, (id, item))| ScoredResult { id, score: 1.0 - rank as f32 / count, item })
            .collect::<Vec<_>>();
        tracing::debug!(%class, k, hits = hits.len(), "vector database search");
        Ok(hits)
    }

    fn delete_indices(&self) -> Result<()> {
        let Some(store) = self.state.available() else {
            tracing::debug!("vector database disabled, nothing to delete");
            return Ok(());
        };
        for class in RecordClass::ALL {
            let name = class.collection_name();
            store
                .rt
                .block_on(async {
                    table::drop_table_if_exists(&store.conn, name).await?;
                    table::ensure_table(&store.conn, name, build_record_schema(store.dim)).await
                })
                .with_context(|| format!("resetting collection {name}"))?;
        }
        tracing::info!("vector database collections reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_keep_the_last_record() {
        let a = IndexedRecord::from_pairs([("statement_id", "S1"), ("text", "old")]);
        let b = IndexedRecord::from_pairs([("statement_id", "S2"), ("text", "other")]);
        let c = IndexedRecord::from_pairs([("statement_id", "S1"), ("text", "new")]);
        let out = dedup_by_id(RecordClass::Statement, vec![&a, &b, &c]);
        let texts: Vec<_> = out.iter().map(|r| r.get_str("text").unwrap()).collect();
        assert_eq!(texts, vec!["new", "other"]);
    }
}
