use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const ID: &str = "id";
pub const PRIMARY: &str = "primary";
pub const ABSTRACT: &str = "abstract";
pub const RECORD: &str = "record";
pub const UPDATED_AT: &str = "updated_at";
pub const VECTOR: &str = "vector";

/// Collection schema shared by both record classes. `record` holds the
/// full record as JSON.
pub fn build_record_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ID, DataType::Utf8, false),
		Field::new(PRIMARY, DataType::Utf8, false),
		Field::new(ABSTRACT, DataType::Utf8, false),
		Field::new(RECORD, DataType::Utf8, false),
		Field::new(UPDATED_AT, DataType::Timestamp(TimeUnit::Millisecond, None), false),
		Field::new(
			VECTOR,
			DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
			true,
		),
	]))
}
