//! Flat L2 index whose entries own their record.
//!
//! Each slot pairs a vector with the record it was computed from, so a hit
//! can never point at the wrong record: the only way to grow the arena is
//! [`VectorArena::push`].

use anyhow::{Result, bail};

use reborn_core::IndexedRecord;

/// Position of an entry in a [`VectorArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
    pub fn index(self) -> usize { self.0 }
}

#[derive(Debug, Clone)]
pub struct VectorArena {
    dim: usize,
    slots: Vec<(Vec<f32>, IndexedRecord)>,
}

impl VectorArena {
    pub fn new(dim: usize) -> Self { Self { dim, slots: Vec::new() } }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { self.slots.len() }

    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    pub fn push(&mut self, vector: Vec<f32>, record: IndexedRecord) -> Result<Handle> {
        if vector.len() != self.dim {
            bail!("vector has dimension {}, index expects {}", vector.len(), self.dim);
        }
        self.slots.push((vector, record));
        Ok(Handle(self.slots.len() - 1))
    }

    pub fn record(&self, handle: Handle) -> Option<&IndexedRecord> {
        self.slots.get(handle.0).map(|(_, record)| record)
    }

    pub fn records(&self) -> impl Iterator<Item = &IndexedRecord> {
        self.slots.iter().map(|(_, record)| record)
    }

    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.slots.iter().map(|(vector, _)| vector.as_slice())
    }

    /// The `k` entries nearest to `query` by squared Euclidean distance,
    /// nearest first. Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Handle, f32)>> {
        if query.len() != self.dim {
            bail!("query has dimension {}, index expects {}", query.len(), self.dim);
        }
        let mut scored: Vec<(Handle, f32)> = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, (vector, _))| (Handle(i), squared_l2(vector, query)))
            .collect();
        let by_distance =
            |a: &(Handle, f32), b: &(Handle, f32)| a.1.total_cmp(&b.1).then(a.0 .0.cmp(&b.0 .0));
        if k < scored.len() {
            scored.select_nth_unstable_by(k, by_distance);
            scored.truncate(k);
        }
        scored.sort_by(by_distance);
        Ok(scored)
    }
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
