use anyhow::{Result, anyhow};
use arrow_array::{
    FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray,
};
use arrow_array::types::Float32Type;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::sync::Arc;

use reborn_core::{IndexedRecord, RecordClass};

use crate::schema::{build_record_schema, ID, RECORD};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn ensure_table(
    conn: &Connection,
    name: &str,
    schema: Arc<arrow_schema::Schema>,
) -> Result<()> {
    let names = conn.table_names().execute().await?;
    if names.contains(&name.to_string()) {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    conn.create_table(name, Box::new(iter)).execute().await?;
    Ok(())
}

pub async fn drop_table_if_exists(conn: &Connection, name: &str) -> Result<()> {
    let names = conn.table_names().execute().await?;
    if names.contains(&name.to_string()) {
        conn.drop_table(name, &[]).await?;
    }
    Ok(())
}

pub async fn count_rows(conn: &Connection, name: &str) -> Result<usize> {
    let t = conn.open_table(name).execute().await?;
    Ok(t.count_rows(None).await?)
}

/// Insert or replace rows keyed on the id column.
pub async fn upsert(conn: &Connection, name: &str, batch: RecordBatch) -> Result<()> {
    let t = conn.open_table(name).execute().await?;
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    let mut mi = t.merge_insert(&[ID]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    let _ = mi.execute(reader).await?;
    Ok(())
}

/// Rows nearest to `query` (L2, the lancedb default), nearest first, as
/// `(id, record)` pairs.
pub async fn nearest(
    conn: &Connection,
    name: &str,
    query: Vec<f32>,
    k: usize,
) -> Result<Vec<(String, IndexedRecord)>> {
    let t = conn.open_table(name).execute().await?;
    if t.count_rows(None).await? == 0 {
        return Ok(Vec::new());
    }
    let mut stream = t.vector_search(query)?.limit(k).execute().await?;
    let mut rows = Vec::new();
    while let Some(batch) = stream.try_next().await? {
        let ids = string_column(&batch, ID)?;
        let records = string_column(&batch, RECORD)?;
        for i in 0..batch.num_rows() {
            let record: IndexedRecord = serde_json::from_str(records.value(i))?;
            rows.push((ids.value(i).to_string(), record));
        }
    }
    Ok(rows)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{name} column missing"))
}

/// Arrow batch for `records` and their embeddings, in the collection schema.
pub fn to_record_batch(
    class: RecordClass,
    records: &[&IndexedRecord],
    vectors: &[Vec<f32>],
    dim: i32,
) -> Result<RecordBatch> {
    if records.len() != vectors.len() {
        return Err(anyhow!("{} records but {} vectors", records.len(), vectors.len()));
    }
    let ids: Vec<&str> =
        records.iter().map(|r| r.get_str(class.id_field()).unwrap_or_default()).collect();
    let primaries: Vec<&str> = records.iter().map(|r| class.primary_text(r)).collect();
    let abstracts: Vec<&str> = records.iter().map(|r| class.secondary_text(r)).collect();
    let json = records.iter().map(|r| serde_json::to_string(r)).collect::<Result<Vec<_>, _>>()?;
    let updated: Vec<i64> = records.iter().map(|r| updated_at_millis(r)).collect();
    if let Some(v) = vectors.iter().find(|v| v.len() != dim as usize) {
        return Err(anyhow!("embedding has dimension {}, collection expects {dim}", v.len()));
    }
    let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
        vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>())),
        dim,
    );
    Ok(RecordBatch::try_new(
        build_record_schema(dim),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(primaries)),
            Arc::new(StringArray::from(abstracts)),
            Arc::new(StringArray::from(json)),
            Arc::new(TimestampMillisecondArray::from(updated)),
            Arc::new(vector_array),
        ],
    )?)
}

/// The record's own `updated_at` when it is RFC 3339, otherwise now.
fn updated_at_millis(record: &IndexedRecord) -> i64 {
    record
        .get_str("updated_at")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.timestamp_millis())
        .unwrap_or_else(|| Utc::now().timestamp_millis())
}
