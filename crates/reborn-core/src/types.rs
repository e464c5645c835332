//! Domain types shared by the keyword, semantic and hybrid engines.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub type RecordId = String;

/// Default number of results returned when a caller passes `k == 0`.
pub const DEFAULT_K: usize = 5;

/// Resolve a caller-supplied `k`, substituting `default_k` for zero.
pub fn effective_k(k: usize, default_k: usize) -> usize {
    if k == 0 { default_k.max(1) } else { k }
}

/// An opaque article or statement record.
///
/// Records are JSON objects; the retrieval core only reads the id field and
/// the text fields of its [`RecordClass`], every other field is carried
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexedRecord(pub Map<String, Value>);

impl IndexedRecord {
    pub fn new() -> Self { Self(Map::new()) }

    /// Build a record from string pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), Value::String(v.into()))).collect())
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> { &self.0 }
}

impl From<Map<String, Value>> for IndexedRecord {
    fn from(map: Map<String, Value>) -> Self { Self(map) }
}

/// The two families of records the search subsystem indexes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordClass {
    Article,
    Statement,
}

impl RecordClass {
    pub const ALL: [RecordClass; 2] = [RecordClass::Article, RecordClass::Statement];

    pub fn id_field(self) -> &'static str {
        match self {
            RecordClass::Article => "article_id",
            RecordClass::Statement => "statement_id",
        }
    }

    /// Field holding the main text: the title of an article, the text of a statement.
    pub fn primary_field(self) -> &'static str {
        match self {
            RecordClass::Article => "title",
            RecordClass::Statement => "text",
        }
    }

    pub fn secondary_field(self) -> &'static str { "abstract" }

    /// Field whose length gates hybrid results.
    pub fn quality_field(self) -> &'static str { self.primary_field() }

    /// Minimum final score (exclusive) for a hybrid result to be kept.
    pub fn hybrid_threshold(self) -> f32 {
        match self {
            RecordClass::Article => 0.6,
            RecordClass::Statement => 0.3,
        }
    }

    /// Base name of the on-disk index and of the keyword index directory.
    pub fn index_name(self) -> &'static str {
        match self {
            RecordClass::Article => "articles_index",
            RecordClass::Statement => "statements_index",
        }
    }

    /// Collection name in the vector database.
    pub fn collection_name(self) -> &'static str {
        match self {
            RecordClass::Article => "Article",
            RecordClass::Statement => "Statement",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            RecordClass::Article => "articles",
            RecordClass::Statement => "statements",
        }
    }

    /// Id of a record, if the record is indexable.
    ///
    /// A record is valid when its id field is a non-empty string and its
    /// primary field is a string. The secondary field is optional.
    pub fn validate<'a>(self, record: &'a IndexedRecord) -> Option<&'a str> {
        let id = record.get_str(self.id_field()).filter(|id| !id.is_empty())?;
        record.get_str(self.primary_field())?;
        Some(id)
    }

    pub fn primary_text<'a>(self, record: &'a IndexedRecord) -> &'a str {
        record.get_str(self.primary_field()).unwrap_or_default()
    }

    pub fn secondary_text<'a>(self, record: &'a IndexedRecord) -> &'a str {
        record.get_str(self.secondary_field()).unwrap_or_default()
    }

    /// Text fed to the embedding model: `"{primary} {secondary}"`.
    pub fn composite_text(self, record: &IndexedRecord) -> String {
        format!("{} {}", self.primary_text(record), self.secondary_text(record))
    }

    /// Keep the valid records, logging and dropping the rest.
    pub fn select_valid(self, records: &[IndexedRecord]) -> Vec<&IndexedRecord> {
        records
            .iter()
            .filter(|r| {
                let ok = self.validate(r).is_some();
                if !ok {
                    tracing::warn!(
                        class = %self,
                        id = ?r.get_str(self.id_field()),
                        "skipping invalid record"
                    );
                }
                ok
            })
            .collect()
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.plural()) }
}

impl FromStr for RecordClass {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "article" | "articles" => Ok(RecordClass::Article),
            "statement" | "statements" => Ok(RecordClass::Statement),
            other => Err(crate::error::Error::InvalidConfig(format!(
                "unknown record class '{other}'"
            ))),
        }
    }
}

/// One candidate returned by a single engine.
///
/// `score` is engine-specific but higher is always better: the keyword
/// engine reports its native relevance score, the local semantic engine
/// `1 / (1 + distance)`, the vector-database engine a rank-derived score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: RecordId,
    pub score: f32,
    pub item: IndexedRecord,
}

/// A hybrid result with its fused and per-engine scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub id: RecordId,
    pub item: IndexedRecord,
    pub final_score: f32,
    pub semantic_score: f32,
    pub keyword_score: f32,
}

/// Ranked hybrid results plus their ids in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridHits {
    pub results: Vec<FusedResult>,
    pub ids: Vec<RecordId>,
}

/// Which engine answers a query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
}
