use anyhow::{Context, Result, anyhow, bail};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use reborn_core::config::SearchSettings;
use reborn_core::types::{effective_k, DEFAULT_K};
use reborn_core::{IndexedRecord, RecordClass, ScoredResult, SearchBackend};
use reborn_embed::EmbeddingProvider;

use crate::arena::VectorArena;
use crate::persist;

/// Semantic search over a local flat-L2 index per record class.
///
/// Each class index lives in memory once built or loaded and is mirrored to
/// `<base_dir>/<class index name>.{index,json}` after every add. Adds reload
/// the files first, so several processes sharing a directory converge, with
/// the last writer winning on concurrent adds.
pub struct LocalSemanticEngine {
    provider: Arc<EmbeddingProvider>,
    base_dir: PathBuf,
    default_k: usize,
    indices: HashMap<RecordClass, Mutex<Option<VectorArena>>>,
}

impl LocalSemanticEngine {
    pub fn new(provider: Arc<EmbeddingProvider>, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let indices = RecordClass::ALL
            .into_iter()
            .map(|class| {
                let loaded = match persist::load(&base_dir, class.index_name()) {
                    Ok(arena) => arena,
                    Err(e) => {
                        tracing::warn!(
                            %class,
                            error = %format!("{e:#}"),
                            "could not load local index"
                        );
                        None
                    }
                };
                (class, Mutex::new(loaded))
            })
            .collect();
        Self { provider, base_dir, default_k: DEFAULT_K, indices }
    }

    pub fn from_settings(provider: Arc<EmbeddingProvider>, settings: &SearchSettings) -> Self {
        Self::new(provider, settings.index_dir()).with_default_k(settings.default_k)
    }

    pub fn with_default_k(mut self, default_k: usize) -> Self {
        self.default_k = default_k;
        self
    }

    /// Entries held in memory for `class`.
    pub fn len(&self, class: RecordClass) -> Result<usize> {
        Ok(self.lock(class)?.as_ref().map_or(0, VectorArena::len))
    }

    fn lock(&self, class: RecordClass) -> Result<MutexGuard<'_, Option<VectorArena>>> {
        self.indices
            .get(&class)
            .ok_or_else(|| anyhow!("no index slot for {class}"))?
            .lock()
            .map_err(|e| anyhow!("{class} index lock poisoned: {e}"))
    }
}

impl SearchBackend for LocalSemanticEngine {
    fn name(&self) -> &str { "semantic" }

    fn add(&self, class: RecordClass, records: &[IndexedRecord]) -> Result<usize> {
        let valid = class.select_valid(records);
        if valid.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = valid.iter().map(|r| class.composite_text(r)).collect();
        let vectors = self.provider.encode(&texts).with_context(|| format!("embedding {class}"))?;
        let width = vectors.first().map_or(0, Vec::len);

        let mut slot = self.lock(class)?;
        if let Some(on_disk) = persist::load(&self.base_dir, class.index_name())? {
            *slot = Some(on_disk);
        }
        let arena = slot.get_or_insert_with(|| VectorArena::new(width));
        if arena.dim() != width {
            bail!("{class} index has dimension {}, embeddings have {width}", arena.dim());
        }
        for (vector, record) in vectors.into_iter().zip(valid) {
            arena.push(vector, record.clone())?;
        }
        persist::save(arena, &self.base_dir, class.index_name())
            .with_context(|| format!("saving {class} index"))?;
        tracing::info!(%class, added = texts.len(), total = arena.len(), "local index updated");
        Ok(texts.len())
    }

    fn search(&self, class: RecordClass, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
        let k = effective_k(k, self.default_k);
        let mut slot = self.lock(class)?;
        if slot.is_none() {
            *slot = persist::load(&self.base_dir, class.index_name())?;
        }
        let Some(arena) = slot.as_ref() else {
            tracing::debug!(%class, "no local index yet");
            return Ok(Vec::new());
        };

        let q = self.provider.encode_query(query).context("embedding query")?;
        let id_field = class.id_field();
        let hits = arena
            .search(&q, k)?
            .into_iter()
            .filter_map(|(handle, distance)| {
                let item = arena.record(handle)?;
                Some(ScoredResult {
                    id: item.get_str(id_field).unwrap_or_default().to_string(),
                    score: 1.0 / (1.0 + distance),
                    item: item.clone(),
                })
            })
            .collect::<Vec<_>>();
        tracing::debug!(%class, k, hits = hits.len(), "semantic search");
        Ok(hits)
    }

    fn delete_indices(&self) -> Result<()> {
        for class in RecordClass::ALL {
            let mut slot = self.lock(class)?;
            *slot = None;
            persist::remove(&self.base_dir, class.index_name())
                .with_context(|| format!("removing {class} index files"))?;
        }
        tracing::info!(dir = %self.base_dir.display(), "local indices deleted");
        Ok(())
    }
}
