use std::sync::Mutex;

use reborn_embed::{Embedder, EmbeddingProvider, FakeEmbedder};

/// Encodes each text as `[index_in_text, batch_len]` and records batch sizes.
struct CountingEmbedder {
    batches: Mutex<Vec<usize>>,
}

impl Embedder for CountingEmbedder {
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { 16 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.batches.lock().unwrap().push(texts.len());
        Ok(texts.iter().map(|t| vec![t.parse::<f32>().unwrap(), texts.len() as f32]).collect())
    }
}

struct ShortEmbedder;

impl Embedder for ShortEmbedder {
    fn dim(&self) -> usize { 4 }
    fn max_len(&self) -> usize { 16 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![0.0; 4]).collect())
    }
}

#[test]
fn batching_preserves_input_order() {
    let texts: Vec<String> = (0..7).map(|i| i.to_string()).collect();
    let counting = CountingEmbedder { batches: Mutex::new(vec![]) };
    let provider = EmbeddingProvider::new(Box::new(counting), 3);
    let out = provider.encode(&texts).expect("encode");
    let firsts: Vec<f32> = out.iter().map(|v| v[0]).collect();
    assert_eq!(firsts, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let sizes: Vec<f32> = out.iter().map(|v| v[1]).collect();
    assert_eq!(sizes, vec![3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 1.0]);
}

#[test]
fn batch_size_does_not_change_vectors() {
    let texts: Vec<String> = ["graph networks", "drug discovery", "aspirin", "fever", "rust"]
        .iter().map(|s| s.to_string()).collect();
    let one = EmbeddingProvider::new(Box::new(FakeEmbedder::new(32)), 1);
    let many = EmbeddingProvider::new(Box::new(FakeEmbedder::new(32)), 4);
    let (one, many) = (one.encode(&texts).expect("encode"), many.encode(&texts).expect("encode"));
    assert_eq!(one, many);
}

#[test]
fn zero_batch_size_is_treated_as_one() {
    let provider = EmbeddingProvider::new(Box::new(FakeEmbedder::new(8)), 0);
    assert_eq!(provider.batch_size(), 1);
    assert_eq!(provider.encode(&["a".into(), "b".into()]).expect("encode").len(), 2);
}

#[test]
fn short_batches_are_rejected() {
    let provider = EmbeddingProvider::new(Box::new(ShortEmbedder), 2);
    let err = provider.encode(&["a".into(), "b".into()]).unwrap_err();
    assert!(err.to_string().contains("1 vectors for 2 texts"), "{err}");
}

#[test]
fn query_uses_the_same_path() {
    let provider = EmbeddingProvider::new(Box::new(FakeEmbedder::new(16)), 8);
    let q = provider.encode_query("neural networks").expect("query");
    let batch = provider.encode(&["neural networks".into()]).expect("encode");
    assert_eq!(q, batch[0]);
    assert!(provider.encode(&[]).expect("empty").is_empty());
}
