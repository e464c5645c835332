//! Score fusion: union of semantic and keyword hits by id, per-column
//! min-max normalisation, weighted sum, threshold and quality filter.

use std::collections::HashMap;

use reborn_core::{FusedResult, HybridHits, RecordClass, ScoredResult};

/// Minimum length (in characters) of the quality field of a kept hit, exclusive.
pub const MIN_QUALITY_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    pub semantic: f32,
    pub keyword: f32,
}

impl Default for HybridWeights {
    fn default() -> Self { Self { semantic: 0.7, keyword: 0.3 } }
}

impl HybridWeights {
    /// Weights scaled to sum to one. Misconfigured weights are logged, never
    /// rejected; a non-positive sum falls back to the defaults.
    pub fn new(semantic: f32, keyword: f32) -> Self {
        let total = semantic + keyword;
        if !(total > 0.0) || semantic < 0.0 || keyword < 0.0 {
            tracing::warn!(semantic, keyword, "invalid hybrid weights, using defaults");
            return Self::default();
        }
        if (total - 1.0).abs() > 1e-6 {
            tracing::warn!(semantic, keyword, "hybrid weights do not sum to 1, normalizing");
            return Self { semantic: semantic / total, keyword: keyword / total };
        }
        Self { semantic, keyword }
    }
}

/// Min-max normalise into `[0, 1]`; a flat column maps to `0.5` everywhere.
pub fn normalize(scores: &[f32]) -> Vec<f32> {
    let Some(&first) = scores.first() else { return Vec::new() };
    let (min, max) = scores.iter().fold((first, first), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    if min == max {
        return vec![0.5; scores.len()];
    }
    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

struct Entry {
    id: String,
    item: reborn_core::IndexedRecord,
    semantic: f32,
    keyword: f32,
}

/// Fuse one query's hits for `class`.
///
/// `keyword` is `None` when no keyword engine is configured. The keyword
/// column only contributes when it has at least one hit.
pub fn fuse(
    class: RecordClass,
    semantic: Vec<ScoredResult>,
    keyword: Option<Vec<ScoredResult>>,
    weights: HybridWeights,
) -> HybridHits {
    let mut entries: Vec<Entry> = Vec::with_capacity(semantic.len());
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for hit in semantic {
        match by_id.get(&hit.id) {
            Some(&i) => {
                entries[i].item = hit.item;
                entries[i].semantic = hit.score;
            }
            None => {
                by_id.insert(hit.id.clone(), entries.len());
                entries.push(Entry {
                    id: hit.id,
                    item: hit.item,
                    semantic: hit.score,
                    keyword: 0.0,
                });
            }
        }
    }

    let keyword = keyword.filter(|hits| !hits.is_empty());
    let use_keyword = keyword.is_some();
    for hit in keyword.into_iter().flatten() {
        match by_id.get(&hit.id) {
            Some(&i) => entries[i].keyword = hit.score,
            None => {
                by_id.insert(hit.id.clone(), entries.len());
                entries.push(Entry {
                    id: hit.id,
                    item: hit.item,
                    semantic: 0.0,
                    keyword: hit.score,
                });
            }
        }
    }

    let norm_semantic = normalize(&entries.iter().map(|e| e.semantic).collect::<Vec<_>>());
    let norm_keyword = if use_keyword {
        normalize(&entries.iter().map(|e| e.keyword).collect::<Vec<_>>())
    } else {
        vec![0.0; entries.len()]
    };

    let threshold = class.hybrid_threshold();
    let quality_field = class.quality_field();
    let mut results: Vec<FusedResult> = entries
        .into_iter()
        .zip(norm_semantic.into_iter().zip(norm_keyword))
        .filter_map(|(entry, (ns, nk))| {
            let keyword_part = if use_keyword { weights.keyword * nk } else { 0.0 };
            let final_score = weights.semantic * ns + keyword_part;
            if final_score <= threshold {
                return None;
            }
            let long_enough = entry
                .item
                .get_str(quality_field)
                .is_some_and(|text| text.chars().count() > MIN_QUALITY_CHARS);
            if !long_enough {
                tracing::debug!(id = %entry.id, "dropping hybrid hit with short {quality_field}");
                return None;
            }
            Some(FusedResult {
                id: entry.id,
                item: entry.item,
                final_score,
                semantic_score: entry.semantic,
                keyword_score: if use_keyword { entry.keyword } else { 0.0 },
            })
        })
        .collect();

    results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    let ids = results.iter().map(|r| r.id.clone()).collect();
    HybridHits { results, ids }
}
