use anyhow::Result;
use tantivy::schema::{
	Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const ANALYZER: &str = "text_with_stopwords";

/// Field handles of a class index. Both record classes share one schema.
#[derive(Debug, Clone, Copy)]
pub struct KeywordFields {
	pub id: Field,
	pub primary: Field,
	pub secondary: Field,
	pub record: Field,
}

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("id", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default()
		.set_tokenizer(ANALYZER)
		.set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field("primary", text_options.clone());
	schema_builder.add_text_field("abstract", text_options);
	// Full record as JSON, returned with each hit.
	schema_builder.add_text_field("record", STORED);
	schema_builder.build()
}

pub fn extract_fields(schema: &Schema) -> Result<KeywordFields> {
	Ok(KeywordFields {
		id: schema.get_field("id")?,
		primary: schema.get_field("primary")?,
		secondary: schema.get_field("abstract")?,
		record: schema.get_field("record")?,
	})
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in",
		"is", "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "or", "but",
		"not", "this", "these", "they", "them", "their", "there", "then", "than", "so", "if",
		"when", "where", "why", "how", "what", "which", "who", "whom", "whose", "can", "could",
		"should", "would", "may", "might", "must", "shall", "do", "does", "did", "have", "had",
		"having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(ANALYZER, tokenizer);
}
