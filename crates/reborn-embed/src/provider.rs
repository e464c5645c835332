use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};

use reborn_core::config::EmbeddingSettings;
use reborn_core::traits::Embedder;

/// Batches encode calls over an [`Embedder`].
///
/// Batch size only affects throughput: output `i` is always the vector of
/// input `i`.
pub struct EmbeddingProvider {
    embedder: Box<dyn Embedder>,
    batch_size: usize,
    show_progress: bool,
}

impl EmbeddingProvider {
    pub fn new(embedder: Box<dyn Embedder>, batch_size: usize) -> Self {
        Self { embedder, batch_size: batch_size.max(1), show_progress: false }
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let embedder = crate::get_embedder(settings)?;
        Ok(Self::new(embedder, settings.batch_size).with_progress(settings.show_progress))
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn dim(&self) -> usize { self.embedder.dim() }

    pub fn batch_size(&self) -> usize { self.batch_size }

    pub fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let dim = self.embedder.dim();
        let mut out = Vec::with_capacity(texts.len());
        let pb = if self.show_progress && texts.len() > self.batch_size {
            Some(progress_bar(texts.len())?)
        } else {
            None
        };

        for (batch_no, chunk) in texts.chunks(self.batch_size).enumerate() {
            let vectors = self
                .embedder
                .embed_batch(chunk)
                .with_context(|| format!("embedding batch {batch_no} ({} texts)", chunk.len()))?;
            if vectors.len() != chunk.len() {
                bail!("embedder returned {} vectors for {} texts", vectors.len(), chunk.len());
            }
            if let Some(v) = vectors.iter().find(|v| v.len() != dim) {
                bail!("embedder returned a {}-wide vector, expected {dim}", v.len());
            }
            out.extend(vectors);
            if let Some(pb) = &pb { pb.inc(chunk.len() as u64); }
        }

        if let Some(pb) = pb { pb.finish_with_message("done"); }
        Ok(out)
    }

    pub fn encode_query(&self, query: &str) -> Result<Vec<f32>> {
        self.encode(&[query.to_string()])?
            .pop()
            .context("embedder returned no vector for the query")
    }
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(concat!(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ",
                "{pos}/{len} texts ({percent}%) {msg}"
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
