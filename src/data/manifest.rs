// ============================================================
// Layer 4 — Manifest Files
// ============================================================
// A manifest is the list of segments of one split, stored as a
// JSON array in `<save_folder>/<split>.json`.

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::domain::segment::Segment;

pub fn write_manifest(path: impl AsRef<Path>, segments: &[Segment]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(segments)?;
    fs::write(path, json).with_context(|| format!("Cannot write manifest '{}'", path.display()))?;
    tracing::debug!("Wrote {} segments to '{}'", segments.len(), path.display());
    Ok(())
}

pub fn read_manifest(path: impl AsRef<Path>) -> Result<Vec<Segment>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read manifest '{}'. Has the corpus been prepared?", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed manifest '{}'", path.display()))
}
