use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use reborn_core::config::SearchSettings;
use reborn_core::types::{effective_k, DEFAULT_K};
use reborn_core::{Availability, IndexedRecord, RecordClass, ScoredResult, SearchBackend};

use crate::index::ClassIndex;

/// Keyword engine over one tantivy index per record class.
///
/// The root directory plays the role of the text-search service: if it
/// cannot be created the engine is disabled for its whole lifetime.
pub struct TantivyKeywordEngine {
	state: Availability<KeywordStore>,
	default_k: usize,
}

struct KeywordStore {
	root: PathBuf,
	open: Mutex<HashMap<RecordClass, Arc<ClassIndex>>>,
}

impl KeywordStore {
	fn connect(root: PathBuf) -> Result<Self> {
		std::fs::create_dir_all(&root)
			.with_context(|| format!("creating keyword root {}", root.display()))?;
		Ok(Self { root, open: Mutex::new(HashMap::new()) })
	}

	fn class_dir(&self, class: RecordClass) -> PathBuf { self.root.join(class.index_name()) }

	/// Cached index of `class`, opened from disk on first use. With `create`
	/// a missing index is created, otherwise `None` is returned.
	fn class_index(&self, class: RecordClass, create: bool) -> Result<Option<Arc<ClassIndex>>> {
		let mut open = self.open.lock().map_err(|e| anyhow!("keyword index map poisoned: {e}"))?;
		if let Some(index) = open.get(&class) {
			return Ok(Some(index.clone()));
		}
		let dir = self.class_dir(class);
		let index = if create {
			Some(ClassIndex::open_or_create(&dir)?)
		} else {
			ClassIndex::open_existing(&dir)?
		};
		Ok(index.map(|index| {
			let index = Arc::new(index);
			open.insert(class, index.clone());
			index
		}))
	}
}

impl TantivyKeywordEngine {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		let root = root.into();
		tracing::debug!(root = %root.display(), "opening keyword engine");
		Self { state: Availability::probe("keyword", KeywordStore::connect(root)), default_k: DEFAULT_K }
	}

	pub fn from_settings(settings: &SearchSettings) -> Self {
		Self::new(settings.keyword_root()).with_default_k(settings.default_k)
	}

	pub fn with_default_k(mut self, default_k: usize) -> Self {
		self.default_k = default_k;
		self
	}

	/// Documents currently visible to searches of `class`.
	pub fn count(&self, class: RecordClass) -> Result<u64> {
		let Some(store) = self.state.available() else { return Ok(0) };
		Ok(store.class_index(class, false)?.map(|i| i.num_docs()).unwrap_or(0))
	}
}

impl SearchBackend for TantivyKeywordEngine {
	fn name(&self) -> &str { "keyword" }

	fn is_available(&self) -> bool { self.state.is_available() }

	fn add(&self, class: RecordClass, records: &[IndexedRecord]) -> Result<usize> {
		let Some(store) = self.state.available() else {
			tracing::debug!(%class, "keyword engine disabled, skipping add");
			return Ok(0);
		};
		let valid = class.select_valid(records);
		if valid.is_empty() {
			return Ok(0);
		}
		let index = store
			.class_index(class, true)?
			.ok_or_else(|| anyhow!("keyword index for {class} could not be created"))?;
		let indexed = index.upsert(class, &valid).with_context(|| format!("indexing {class}"))?;
		tracing::info!(%class, indexed, "keyword index updated");
		Ok(indexed)
	}

	fn search(&self, class: RecordClass, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
		let Some(store) = self.state.available() else {
			tracing::debug!(%class, "keyword engine disabled, empty result");
			return Ok(Vec::new());
		};
		let Some(index) = store.class_index(class, false)? else {
			return Ok(Vec::new());
		};
		let k = effective_k(k, self.default_k);
		let hits = index.search(query, k).with_context(|| format!("searching {class}"))?;
		tracing::debug!(%class, k, hits = hits.len(), "keyword search");
		Ok(hits)
	}

	fn delete_indices(&self) -> Result<()> {
		let Some(store) = self.state.available() else {
			tracing::debug!("keyword engine disabled, nothing to delete");
			return Ok(());
		};
		let mut open = store.open.lock().map_err(|e| anyhow!("keyword index map poisoned: {e}"))?;
		open.clear();
		for class in RecordClass::ALL {
			let dir = store.class_dir(class);
			match std::fs::remove_dir_all(&dir) {
				Ok(()) => {}
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
				Err(e) => return Err(e).with_context(|| format!("removing {}", dir.display())),
			}
		}
		tracing::info!(root = %store.root.display(), "keyword indices deleted");
		Ok(())
	}
}
