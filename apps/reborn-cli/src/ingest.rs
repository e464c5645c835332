use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::{Path, PathBuf};

use reborn_core::{Error, IndexedRecord};

/// Expand the CLI paths: files are taken as given, directories contribute
/// every `*.json` below them in path order.
pub fn collect_json_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "json")
                })
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(Error::NotFound(path.display().to_string()).into());
        }
    }
    Ok(files)
}

/// Records in one JSON file: a single object or an array of objects.
pub fn read_records(path: &Path) -> Result<Vec<IndexedRecord>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(vec![IndexedRecord::from(map)]),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Object(map) => Some(IndexedRecord::from(map)),
                _ => {
                    tracing::warn!(file = %path.display(), index = i, "skipping non-object entry");
                    None
                }
            })
            .collect()),
        _ => bail!("{} holds neither an object nor an array", path.display()),
    }
}
