use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::schema::Value;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use reborn_core::{IndexedRecord, RecordClass, ScoredResult};

use crate::query::build_query;
use crate::tantivy_utils::{build_schema, extract_fields, register_tokenizer, KeywordFields};

/// One on-disk tantivy index holding the records of a single class.
pub struct ClassIndex {
	index: Index,
	reader: IndexReader,
	fields: KeywordFields,
	write_lock: Mutex<()>,
}

impl ClassIndex {
	pub fn open_or_create(dir: &Path) -> Result<Self> {
		std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
		let index = if dir.join("meta.json").exists() {
			Index::open_in_dir(dir)?
		} else {
			Index::create_in_dir(dir, build_schema())?
		};
		Self::from_index(index)
	}

	/// `None` when no index was ever created in `dir`.
	pub fn open_existing(dir: &Path) -> Result<Option<Self>> {
		if !dir.join("meta.json").exists() {
			return Ok(None);
		}
		Ok(Some(Self::from_index(Index::open_in_dir(dir)?)?))
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = extract_fields(&index.schema())?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { index, reader, fields, write_lock: Mutex::new(()) })
	}

	/// Index `records` keyed by their id, replacing earlier documents with
	/// the same id, then refresh the reader.
	pub fn upsert(&self, class: RecordClass, records: &[&IndexedRecord]) -> Result<usize> {
		let _guard = self.write_lock.lock().map_err(|e| anyhow!("keyword write lock poisoned: {e}"))?;
		let mut writer: IndexWriter = self.index.writer(50_000_000)?;
		for record in records {
			let id = record.get_str(class.id_field()).unwrap_or_default();
			let mut doc = TantivyDocument::new();
			doc.add_text(self.fields.id, id);
			doc.add_text(self.fields.primary, class.primary_text(record));
			doc.add_text(self.fields.secondary, class.secondary_text(record));
			doc.add_text(self.fields.record, serde_json::to_string(record)?);
			writer.delete_term(Term::from_field_text(self.fields.id, id));
			writer.add_document(doc)?;
		}
		writer.commit()?;
		writer.wait_merging_threads()?;
		self.reader.reload()?;
		Ok(records.len())
	}

	pub fn search(&self, query_text: &str, k: usize) -> Result<Vec<ScoredResult>> {
		let Some(query) = build_query(&self.index, &self.fields, query_text)? else {
			return Ok(Vec::new());
		};
		let searcher = self.reader.searcher();
		let limit = usize::try_from(searcher.num_docs()).map_or(k, |n| k.min(n));
		if limit == 0 {
			return Ok(Vec::new());
		}
		let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let id = doc.get_first(self.fields.id).and_then(|v| v.as_str()).unwrap_or("").to_string();
			let item = match doc.get_first(self.fields.record).and_then(|v| v.as_str()) {
				Some(json) => serde_json::from_str::<IndexedRecord>(json)
					.with_context(|| format!("decoding stored record {id}"))?,
				None => IndexedRecord::new(),
			};
			hits.push(ScoredResult { id, score, item });
		}
		Ok(hits)
	}

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }
}
