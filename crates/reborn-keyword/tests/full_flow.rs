use serde_json::json;
use tempfile::TempDir;

use reborn_core::{IndexedRecord, RecordClass, SearchBackend};
use reborn_keyword::TantivyKeywordEngine;

fn record(value: serde_json::Value) -> IndexedRecord {
    serde_json::from_value(value).expect("record")
}

fn articles() -> Vec<IndexedRecord> {
    vec![
        record(json!({
            "article_id": "A1",
            "title": "Graph Neural Networks for Drug Discovery",
            "abstract": "We present a novel GNN architecture for molecular property prediction."
        })),
        record(json!({
            "article_id": "A2",
            "title": "Soil Microbiomes in Arid Regions",
            "abstract": "A field survey of bacterial diversity."
        })),
        record(json!({
            "article_id": "A3",
            "title": "Convolutional Networks for Image Segmentation",
            "abstract": "Dense prediction with encoder-decoder models."
        })),
    ]
}

#[test]
fn keyword_full_flow() {
    let dir = TempDir::new().unwrap();
    let engine = TantivyKeywordEngine::new(dir.path().join("keyword"));
    assert!(engine.is_available());

    assert_eq!(engine.add_articles(&articles()).expect("add"), 3);
    assert_eq!(engine.count(RecordClass::Article).unwrap(), 3);

    let hits = engine.search_articles("graph neural networks", 5).expect("search");
    assert!(!hits.is_empty());
    assert_eq!(hits[0].id, "A1");
    assert_eq!(hits[0].item.get_str("article_id"), Some("A1"));
    for pair in hits.windows(2) { assert!(pair[0].score >= pair[1].score); }

    // Abstract-only term.
    let hits = engine.search_articles("microbiomes bacterial", 5).expect("search");
    assert_eq!(hits[0].id, "A2");
}

#[test]
fn misspelled_queries_match_fuzzily() {
    let dir = TempDir::new().unwrap();
    let engine = TantivyKeywordEngine::new(dir.path());
    engine.add_articles(&articles()).expect("add");

    let hits = engine.search_articles("nueral netwroks", 5).expect("search");
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert!(ids.contains(&"A1"), "got {ids:?}");
}

#[test]
fn readding_an_id_replaces_the_document() {
    let dir = TempDir::new().unwrap();
    let engine = TantivyKeywordEngine::new(dir.path());
    let first = record(json!({"statement_id": "S1", "text": "Aspirin reduces fever"}));
    let second = record(json!({"statement_id": "S1", "text": "Ibuprofen reduces inflammation"}));
    engine.add_statements(&[first]).unwrap();
    engine.add_statements(&[second]).unwrap();

    assert_eq!(engine.count(RecordClass::Statement).unwrap(), 1);
    let hits = engine.search_statements("ibuprofen", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item.get_str("text"), Some("Ibuprofen reduces inflammation"));
    assert!(engine.search_statements("aspirin", 5).unwrap().is_empty());
}

#[test]
fn invalid_records_are_skipped() {
    let dir = TempDir::new().unwrap();
    let engine = TantivyKeywordEngine::new(dir.path());
    let batch = vec![
        record(json!({"statement_id": "S1", "text": "Vitamin D supports bone health"})),
        record(json!({"text": "no id here"})),
        record(json!({"statement_id": "S3", "abstract": "no text field"})),
    ];
    assert_eq!(engine.add_statements(&batch).expect("add"), 1);
    assert_eq!(engine.add_statements(&batch[1..]).expect("add"), 0);
    assert_eq!(engine.count(RecordClass::Statement).unwrap(), 1);
}

#[test]
fn empty_states_return_no_hits() {
    let dir = TempDir::new().unwrap();
    let engine = TantivyKeywordEngine::new(dir.path());
    assert!(engine.search_articles("anything", 5).unwrap().is_empty());

    engine.add_articles(&articles()).unwrap();
    assert!(engine.search_articles("", 5).unwrap().is_empty());
    assert!(engine.search_articles("the of and", 5).unwrap().is_empty());
    assert!(engine.search_statements("graph", 5).unwrap().is_empty());
}

#[test]
fn k_limits_and_zero_uses_default() {
    let dir = TempDir::new().unwrap();
    let engine = TantivyKeywordEngine::new(dir.path()).with_default_k(2);
    engine.add_articles(&articles()).unwrap();
    assert_eq!(engine.search_articles("networks prediction", 1).unwrap().len(), 1);
    assert_eq!(engine.search_articles("networks prediction", 0).unwrap().len(), 2);
}

#[test]
fn huge_k_is_capped_by_document_count() {
    let dir = TempDir::new().unwrap();
    let engine = TantivyKeywordEngine::new(dir.path().join("keyword"));
    engine.add_articles(&articles()[..1]).expect("add");

    let hits = engine.search_articles("graph", usize::MAX / 4).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "A1");
}

#[test]
fn indices_survive_a_new_engine_instance() {
    let dir = TempDir::new().unwrap();
    TantivyKeywordEngine::new(dir.path()).add_articles(&articles()).unwrap();

    let reopened = TantivyKeywordEngine::new(dir.path());
    let hits = reopened.search_articles("segmentation", 5).unwrap();
    assert_eq!(hits[0].id, "A3");
}

#[test]
fn delete_indices_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let engine = TantivyKeywordEngine::new(dir.path());
    engine.add_articles(&articles()).unwrap();

    engine.delete_indices().expect("first delete");
    engine.delete_indices().expect("second delete");
    assert!(engine.search_articles("graph", 5).unwrap().is_empty());
    assert!(!dir.path().join("articles_index").exists());

    // Usable again after a reset.
    engine.add_articles(&articles()[..1]).unwrap();
    assert_eq!(engine.search_articles("graph", 5).unwrap().len(), 1);
}

#[test]
fn unreachable_root_disables_the_engine() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let engine = TantivyKeywordEngine::new(blocker.join("keyword"));
    assert!(!engine.is_available());
    assert_eq!(engine.add_articles(&articles()).unwrap(), 0);
    assert!(engine.search_articles("graph", 5).unwrap().is_empty());
    engine.delete_indices().unwrap();
}
