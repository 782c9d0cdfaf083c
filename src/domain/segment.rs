// ============================================================
// Layer 3 — Utterance and Segment Domain Types
// ============================================================
// An Utterance is one recording found in the corpus directory.
// A Segment is a fixed-duration window cut from an utterance;
// segments are the rows of the train/dev manifests and the
// unit the data loaders iterate over.
//
// Sample positions are stored as sample indices (not seconds)
// so reading a segment is an exact seek + read.

use serde::{Deserialize, Serialize};

/// A single recording belonging to one speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Unique id, e.g. `id10001--1zcIwhmdeo4--00001`
    pub id: String,

    /// Path to the wav file
    pub wav: String,

    /// Speaker label (the top-level corpus directory name)
    pub spk_id: String,
}

impl Utterance {
    pub fn new(id: impl Into<String>, wav: impl Into<String>, spk_id: impl Into<String>) -> Self {
        Self {
            id:     id.into(),
            wav:    wav.into(),
            spk_id: spk_id.into(),
        }
    }
}

/// One manifest row: a `[start, stop)` sample window of an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// `<utterance id>_<start>_<stop>`
    pub id: String,

    pub wav: String,

    /// First sample of the window (inclusive)
    pub start: usize,

    /// Last sample of the window (exclusive)
    pub stop: usize,

    /// Duration in seconds
    pub duration: f64,

    pub spk_id: String,
}

impl Segment {
    pub fn from_utterance(utt: &Utterance, start: usize, stop: usize, sample_rate: u32) -> Self {
        Self {
            id:       format!("{}_{}_{}", utt.id, start, stop),
            wav:      utt.wav.clone(),
            start,
            stop,
            duration: (stop - start) as f64 / sample_rate as f64,
            spk_id:   utt.spk_id.clone(),
        }
    }

    /// Number of samples in the window
    pub fn num_samples(&self) -> usize {
        self.stop.saturating_sub(self.start)
    }
}
