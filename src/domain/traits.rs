// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The corpus preparer only needs "something that lists the
// utterances of a corpus". VoxCelebCorpus walks the standard
// <speaker>/<session>/<utt>.wav layout; tests plug in
// in-memory sources.

use anyhow::Result;
use crate::domain::segment::Utterance;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can enumerate the utterances of a corpus.
///
/// Implementations:
///   - VoxCelebCorpus → walks a VoxCeleb1-style directory tree
pub trait CorpusSource {
    /// List every utterance, in a stable order.
    fn load_all(&self) -> Result<Vec<Utterance>>;
}
