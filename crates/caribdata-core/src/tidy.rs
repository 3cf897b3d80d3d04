//! Tidy-output writers: per-dimension CSVs plus the sidecar files every
//! source directory carries (`_manifest.json`, `_dictionary.csv`,
//! `_errors.json`, `_dataset_card.md`) and the top-level `_freshness.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::BuildError;
use crate::model::{DictionaryRow, FreshnessStamp, Manifest};
use crate::source::ErrorRecord;

/// Write rows as a headed CSV, creating parent directories as needed.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), BuildError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a pretty-printed JSON document with a trailing newline.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BuildError> {
    ensure_parent(path)?;
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    fs::write(path, body)?;
    Ok(())
}

pub fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<(), BuildError> {
    write_json(&dir.join("_manifest.json"), manifest)
}

pub fn write_dictionary(dir: &Path, rows: &[DictionaryRow]) -> Result<(), BuildError> {
    write_csv(&dir.join("_dictionary.csv"), rows)
}

/// Write the error sidecar, or remove a stale one when the run was clean so
/// a past failure cannot outlive its fix.
pub fn write_errors(dir: &Path, errors: &[ErrorRecord]) -> Result<(), BuildError> {
    let path = dir.join("_errors.json");
    if errors.is_empty() {
        if path.exists() {
            fs::remove_file(&path)?;
        }
        return Ok(());
    }
    write_json(&path, &errors)
}

pub fn write_freshness(out_dir: &Path, stamp: &FreshnessStamp) -> Result<(), BuildError> {
    write_json(&out_dir.join("_freshness.json"), stamp)
}

/// Load the existing `_freshness.json` so a run can layer its own source
/// entries on top; a missing or unreadable stamp starts from empty.
pub fn read_freshness(out_dir: &Path) -> FreshnessStamp {
    fs::read_to_string(out_dir.join("_freshness.json"))
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

/// Write `_dataset_card.md` only when absent; hand-edited cards survive
/// rebuilds.
pub fn write_dataset_card_once(dir: &Path, body: &str) -> Result<bool, BuildError> {
    let path = dir.join("_dataset_card.md");
    if path.exists() {
        return Ok(false);
    }
    ensure_parent(&path)?;
    fs::write(&path, body)?;
    Ok(true)
}

fn ensure_parent(path: &Path) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| BuildError::OutputDir {
            path: PathBuf::from(parent),
            source,
        })?;
    }
    Ok(())
}
