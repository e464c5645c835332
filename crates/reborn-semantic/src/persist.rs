//! On-disk layout of a class index: `<name>.index` holds a bincode snapshot
//! of the vectors and `<name>.json` the records in the same order.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use reborn_core::IndexedRecord;

use crate::arena::VectorArena;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    version: u32,
    dim: usize,
    rows: usize,
    /// Row-major, `rows * dim` values.
    data: Vec<f32>,
}

pub fn index_path(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join(format!("{name}.index"))
}

pub fn records_path(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join(format!("{name}.json"))
}

/// Write both files, each through a temporary file renamed into place.
pub fn save(arena: &VectorArena, base_dir: &Path, name: &str) -> Result<()> {
    std::fs::create_dir_all(base_dir)
        .with_context(|| format!("creating {}", base_dir.display()))?;

    let snapshot = IndexSnapshot {
        version: SNAPSHOT_VERSION,
        dim: arena.dim(),
        rows: arena.len(),
        data: arena.vectors().flat_map(|v| v.iter().copied()).collect(),
    };
    write_atomically(&index_path(base_dir, name), |w| {
        bincode::serialize_into(w, &snapshot).context("serializing index snapshot")
    })?;

    let records: Vec<&IndexedRecord> = arena.records().collect();
    write_atomically(&records_path(base_dir, name), |w| {
        serde_json::to_writer(w, &records).context("serializing record list")
    })?;
    tracing::debug!(name, rows = arena.len(), "saved local index");
    Ok(())
}

/// `None` when the index has never been saved.
pub fn load(base_dir: &Path, name: &str) -> Result<Option<VectorArena>> {
    let index_file = index_path(base_dir, name);
    let records_file = records_path(base_dir, name);
    match (index_file.exists(), records_file.exists()) {
        (false, false) => return Ok(None),
        (true, true) => {}
        (has_index, has_records) => {
            tracing::warn!(
                name,
                has_index,
                has_records,
                "incomplete local index on disk, ignoring"
            );
            return Ok(None);
        }
    }

    let reader = BufReader::new(
        File::open(&index_file).with_context(|| format!("opening {}", index_file.display()))?,
    );
    let snapshot: IndexSnapshot = bincode::deserialize_from(reader)
        .with_context(|| format!("decoding {}", index_file.display()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        bail!("{} has unsupported version {}", index_file.display(), snapshot.version);
    }
    let Some(expected) = snapshot.rows.checked_mul(snapshot.dim) else {
        bail!(
            "{} has an impossible shape {}x{}",
            index_file.display(),
            snapshot.rows,
            snapshot.dim
        );
    };
    if snapshot.data.len() != expected {
        bail!(
            "{} is truncated: {} values for {}x{}",
            index_file.display(),
            snapshot.data.len(),
            snapshot.rows,
            snapshot.dim
        );
    }

    let reader = BufReader::new(
        File::open(&records_file).with_context(|| format!("opening {}", records_file.display()))?,
    );
    let records: Vec<IndexedRecord> = serde_json::from_reader(reader)
        .with_context(|| format!("decoding {}", records_file.display()))?;
    // Two writers can interleave their renames; positions without a partner are dropped.
    if records.len() != snapshot.rows {
        tracing::warn!(
            name,
            vectors = snapshot.rows,
            records = records.len(),
            "local index files disagree, keeping the aligned prefix"
        );
    }

    let mut arena = VectorArena::new(snapshot.dim);
    if snapshot.dim > 0 {
        for (vector, record) in snapshot.data.chunks(snapshot.dim).zip(records) {
            arena.push(vector.to_vec(), record)?;
        }
    }
    tracing::debug!(name, rows = arena.len(), "loaded local index");
    Ok(Some(arena))
}

/// Remove both files; missing files are fine.
pub fn remove(base_dir: &Path, name: &str) -> Result<()> {
    for path in [index_path(base_dir, name), records_path(base_dir, name)] {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("removing {}", path.display())),
        }
    }
    Ok(())
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
