// ============================================================
// Layer 4 — Speaker Label Encoder
// ============================================================
// Maps speaker labels ("id10001") to dense class indices for the
// output layer. Labels are sorted, so the mapping only depends
// on the set of speakers. Saved as `label_encoder.json` next to
// the checkpoints so extraction decodes with the same table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fs, path::Path};

use crate::domain::segment::Segment;

pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";

pub fn label_encoder_path(save_folder: impl AsRef<Path>) -> std::path::PathBuf {
    save_folder.as_ref().join(LABEL_ENCODER_FILE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    labels: Vec<String>,
}

impl LabelEncoder {
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self { labels: set.into_iter().collect() }
    }

    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a Segment>) -> Self {
        Self::from_labels(segments.into_iter().map(|s| s.spk_id.clone()))
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.labels.binary_search_by(|l| l.as_str().cmp(label)).ok()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write label encoder '{}'", path.display()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read label encoder '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}
