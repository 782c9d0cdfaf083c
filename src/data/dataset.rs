// ============================================================
// Layer 4 — Segment Dataset
// ============================================================
// Implements Burn's Dataset trait over a manifest. Every segment
// is read into memory when the dataset is built, so `get()`
// cannot fail once construction has succeeded.
//
// The constructor checks that every speaker is known to the
// label encoder and that every wav file opens with the expected
// sample rate before any samples are read.

use anyhow::{bail, Context, Result};
use burn::data::dataset::Dataset;
use std::{collections::BTreeSet, path::Path};

use crate::data::{
    audio::{probe_wav, read_segment},
    labels::LabelEncoder,
    manifest::read_manifest,
};
use crate::domain::segment::Segment;

/// One loaded segment with its class index.
#[derive(Debug, Clone)]
pub struct SpeakerItem {
    pub id:        String,
    pub samples:   Vec<f32>,
    pub spk_index: usize,
    pub spk_id:    String,
}

pub struct SegmentDataset {
    items: Vec<SpeakerItem>,
}

impl SegmentDataset {
    pub fn new(segments: Vec<Segment>, labels: &LabelEncoder, sample_rate: u32) -> Result<Self> {
        let spk_indices = segments
            .iter()
            .map(|s| {
                labels
                    .encode(&s.spk_id)
                    .with_context(|| format!("Speaker '{}' of '{}' is not in the label encoder", s.spk_id, s.id))
            })
            .collect::<Result<Vec<_>>>()?;

        let wavs: BTreeSet<&str> = segments.iter().map(|s| s.wav.as_str()).collect();
        for wav in wavs {
            let info = probe_wav(wav)?;
            if info.sample_rate != sample_rate {
                bail!("'{}' is sampled at {} Hz, expected {} Hz", wav, info.sample_rate, sample_rate);
            }
            let longest = segments
                .iter()
                .filter(|s| s.wav == wav)
                .map(|s| s.stop)
                .max()
                .unwrap_or(0);
            if longest > info.num_samples {
                bail!("Manifest points past the end of '{}'", wav);
            }
        }

        let items = segments
            .into_iter()
            .zip(spk_indices)
            .map(|(seg, spk_index)| {
                let samples = read_segment(&seg.wav, seg.start, seg.stop)
                    .with_context(|| format!("Cannot load segment '{}'", seg.id))?;
                Ok(SpeakerItem { id: seg.id, samples, spk_index, spk_id: seg.spk_id })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Loaded {} segments", items.len());
        Ok(Self { items })
    }

    pub fn from_manifest(path: impl AsRef<Path>, labels: &LabelEncoder, sample_rate: u32) -> Result<Self> {
        Self::new(read_manifest(path)?, labels, sample_rate)
    }

    pub fn segment_count(&self) -> usize {
        self.items.len()
    }
}

impl Dataset<SpeakerItem> for SegmentDataset {
    fn get(&self, index: usize) -> Option<SpeakerItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::Utterance;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_wav(path: &Path, n: usize, sample_rate: u32) {
        let spec = WavSpec {
            channels:        1,
            sample_rate,
            bits_per_sample: 16,
            sample_format:   SampleFormat::Int,
        };
        let mut w = WavWriter::create(path, spec).unwrap();
        for i in 0..n {
            w.write_sample(((i % 200) as i16 - 100) * 50).unwrap();
        }
        w.finalize().unwrap();
    }

    fn segments(wav: &Path, spk: &str, count: usize, len: usize) -> Vec<Segment> {
        let utt = Utterance::new(format!("{spk}--u--00001"), wav.to_string_lossy(), spk);
        (0..count).map(|i| Segment::from_utterance(&utt, i * len, (i + 1) * len, 16_000)).collect()
    }

    #[test]
    fn test_items_survive_wav_removal() {
        let dir = tempfile::tempdir().unwrap();
        let a   = dir.path().join("a.wav");
        let b   = dir.path().join("b.wav");
        write_wav(&a, 800, 16_000);
        write_wav(&b, 800, 16_000);

        let mut segs = segments(&a, "id1", 2, 400);
        segs.extend(segments(&b, "id2", 2, 400));
        let labels = LabelEncoder::from_labels(["id1", "id2"]);
        let ds = SegmentDataset::new(segs, &labels, 16_000).unwrap();

        std::fs::remove_file(&b).unwrap();

        assert_eq!(ds.len(), 4);
        let items: Vec<SpeakerItem> = (0..ds.len()).filter_map(|i| ds.get(i)).collect();
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|it| it.samples.len() == 400));
        assert_eq!(items[3].spk_index, labels.encode("id2").unwrap());
        assert!(ds.get(4).is_none());
    }

    #[test]
    fn test_missing_wav_is_error_at_construction() {
        let dir  = tempfile::tempdir().unwrap();
        let segs = segments(&dir.path().join("gone.wav"), "id1", 1, 400);
        let labels = LabelEncoder::from_labels(["id1"]);
        assert!(SegmentDataset::new(segs, &labels, 16_000).is_err());
    }

    #[test]
    fn test_unknown_speaker_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let a   = dir.path().join("a.wav");
        write_wav(&a, 400, 16_000);
        let labels = LabelEncoder::from_labels(["id1"]);
        assert!(SegmentDataset::new(segments(&a, "id9", 1, 400), &labels, 16_000).is_err());
    }

    #[test]
    fn test_sample_rate_mismatch_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let a   = dir.path().join("a.wav");
        write_wav(&a, 400, 8_000);
        let labels = LabelEncoder::from_labels(["id1"]);
        assert!(SegmentDataset::new(segments(&a, "id1", 1, 400), &labels, 16_000).is_err());
    }

    #[test]
    fn test_segment_past_end_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let a   = dir.path().join("a.wav");
        write_wav(&a, 600, 16_000);
        let labels = LabelEncoder::from_labels(["id1"]);
        assert!(SegmentDataset::new(segments(&a, "id1", 2, 400), &labels, 16_000).is_err());
    }
}
