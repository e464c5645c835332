use std::sync::Arc;

use serde_json::json;

use reborn_core::{IndexedRecord, RecordClass, ScoredResult, SearchBackend};
use reborn_hybrid::{fuse, HybridEngine, HybridWeights};

const LONG: &str = "A sufficiently long title that clears the fifty character quality gate";

fn hit(id: &str, score: f32, title: &str) -> ScoredResult {
    let item: IndexedRecord =
        serde_json::from_value(json!({"article_id": id, "title": title})).unwrap();
    ScoredResult { id: id.to_string(), score, item }
}

fn statement(id: &str, score: f32) -> ScoredResult {
    let item: IndexedRecord =
        serde_json::from_value(json!({"statement_id": id, "text": LONG})).unwrap();
    ScoredResult { id: id.to_string(), score, item }
}

struct Fixed {
    hits: Vec<ScoredResult>,
    fail: bool,
}

impl SearchBackend for Fixed {
    fn name(&self) -> &str { "fixed" }
    fn add(&self, _: RecordClass, _: &[IndexedRecord]) -> anyhow::Result<usize> { Ok(0) }
    fn search(&self, _: RecordClass, _: &str, _: usize) -> anyhow::Result<Vec<ScoredResult>> {
        if self.fail { anyhow::bail!("backend exploded") }
        Ok(self.hits.clone())
    }
    fn delete_indices(&self) -> anyhow::Result<()> { Ok(()) }
}

fn fixed(hits: Vec<ScoredResult>) -> Arc<dyn SearchBackend> {
    Arc::new(Fixed { hits, fail: false })
}

#[test]
fn threshold_is_strict() {
    let weights = HybridWeights::new(0.6, 0.4);
    let semantic = vec![hit("X", 1.0, LONG), hit("Y", 0.0, LONG), hit("Z", 1.0, LONG)];
    let keyword = vec![hit("Y", 1.0, LONG), hit("X", 0.0, LONG), hit("Z", 0.01, LONG)];
    let hits = fuse(RecordClass::Article, semantic, Some(keyword), weights);

    // X lands exactly on 0.6 and is dropped; Z is just above.
    assert_eq!(hits.ids, vec!["Z"]);
    assert!(hits.results[0].final_score > 0.6);
    assert_eq!(hits.results[0].semantic_score, 1.0);
    assert_eq!(hits.results[0].keyword_score, 0.01);
}

#[test]
fn short_titles_fail_the_quality_gate() {
    let fifty = "x".repeat(50);
    let fifty_one = "é".repeat(51);
    let hits = || {
        vec![
            hit("short", 1.0, "Tiny"),
            hit("fifty", 1.0, &fifty),
            hit("fifty-one", 1.0, &fifty_one),
            hit("low", 0.0, LONG),
        ]
    };
    let (semantic, keyword) = (hits(), hits());
    let hits = fuse(RecordClass::Article, semantic, Some(keyword), HybridWeights::default());
    assert_eq!(hits.ids, vec!["fifty-one"]);
}

#[test]
fn union_of_both_result_sets() {
    let semantic = vec![statement("S1", 0.9), statement("S2", 0.5)];
    let keyword = vec![statement("S3", 12.0), statement("S1", 3.0)];
    let hits = fuse(RecordClass::Statement, semantic, Some(keyword), HybridWeights::default());

    // S1: 0.7*1 + 0.3*(3/12) = 0.775
    // S3: 0.7*0 + 0.3*1 = 0.3, dropped at 0.3
    // S2: 0.7*(0.5/0.9) ≈ 0.389
    assert_eq!(hits.ids, vec!["S1", "S2"]);
    let s1 = &hits.results[0];
    assert!((s1.final_score - 0.775).abs() < 1e-5);
    assert_eq!(s1.keyword_score, 3.0);
    assert_eq!(s1.semantic_score, 0.9);
}

#[test]
fn keyword_only_hits_are_kept() {
    let semantic = vec![statement("S1", 0.2)];
    let keyword = vec![statement("S2", 8.0), statement("S1", 1.0)];
    let hits = fuse(RecordClass::Statement, semantic, Some(keyword), HybridWeights::new(0.5, 0.5));
    // S1: 0.5*1 + 0.5*0 = 0.5; S2: 0.5*0 + 0.5*1 = 0.5
    assert_eq!(hits.results.len(), 2);
    assert!(hits.ids.contains(&"S2".to_string()));
    assert_eq!(hits.results.iter().find(|r| r.id == "S2").unwrap().semantic_score, 0.0);
}

#[test]
fn flat_semantic_scores_without_keyword_engine() {
    let semantic = vec![statement("S1", 0.8), statement("S2", 0.8), statement("S3", 0.8)];
    let hits = fuse(RecordClass::Statement, semantic.clone(), None, HybridWeights::default());
    assert_eq!(hits.ids, vec!["S1", "S2", "S3"]);
    for r in &hits.results {
        assert!((r.final_score - 0.35).abs() < 1e-6);
        assert_eq!(r.keyword_score, 0.0);
    }

    let articles: Vec<_> = semantic.iter().map(|s| hit(&s.id, s.score, LONG)).collect();
    let fused = fuse(RecordClass::Article, articles, None, HybridWeights::default());
    assert!(fused.results.is_empty());
}

#[test]
fn empty_keyword_results_fall_back_to_semantic_only() {
    let semantic = vec![statement("S1", 1.0), statement("S2", 0.0)];
    let with_empty =
        fuse(RecordClass::Statement, semantic.clone(), Some(vec![]), HybridWeights::default());
    let without = fuse(RecordClass::Statement, semantic, None, HybridWeights::default());
    assert_eq!(with_empty, without);
    assert_eq!(without.ids, vec!["S1"]);
}

#[test]
fn results_are_sorted_and_ids_follow() {
    let semantic = vec![statement("S1", 0.1), statement("S2", 0.5), statement("S3", 1.0)];
    let hits = fuse(RecordClass::Statement, semantic, None, HybridWeights::new(1.0, 0.0));
    assert_eq!(hits.ids, vec!["S3", "S2"]);
    let order: Vec<_> = hits.results.iter().map(|r| r.id.clone()).collect();
    assert_eq!(order, hits.ids);
    assert!(hits.results[0].final_score >= hits.results[1].final_score);
}

#[test]
fn engine_renormalizes_and_runs_both_legs() {
    let engine = HybridEngine::new(
        fixed(vec![statement("S1", 0.9), statement("S2", 0.1)]),
        Some(fixed(vec![statement("S2", 5.0)])),
        HybridWeights { semantic: 1.4, keyword: 0.6 },
    );
    let w = engine.weights();
    assert!((w.semantic - 0.7).abs() < 1e-6 && (w.keyword - 0.3).abs() < 1e-6);

    let hits = engine.search_statements("anything", 5).unwrap();
    // S1: 0.7; S2: 0.3 (dropped at the 0.3 threshold)
    assert_eq!(hits.ids, vec!["S1"]);
}

#[test]
fn engine_without_keyword_backend() {
    let engine =
        HybridEngine::new(fixed(vec![statement("S1", 0.4)]), None, HybridWeights::default());
    let hits = engine.search(RecordClass::Statement, "q", 5).unwrap();
    assert_eq!(hits.ids, vec!["S1"]);
    assert_eq!(hits.results[0].keyword_score, 0.0);
}

#[test]
fn backend_failures_propagate() {
    let failing: Arc<dyn SearchBackend> = Arc::new(Fixed { hits: vec![], fail: true });
    let semantic = fixed(vec![statement("S1", 0.4)]);
    let engine = HybridEngine::new(semantic, Some(failing), HybridWeights::default());
    let err = engine.search_statements("q", 5).unwrap_err();
    assert!(err.to_string().contains("backend exploded"));
}
