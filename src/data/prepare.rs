// ============================================================
// Layer 4 — VoxCeleb1 Corpus Preparation
// ============================================================
// Turns a raw corpus directory into per-split manifests:
//
//   Step 1: List utterances               (VoxCelebCorpus)
//   Step 2: Seeded split by utterance     (split_by_ratio)
//   Step 3: Optional silence trimming     (trim_silence)
//   Step 4: Fixed-duration chunking       (Chunker)
//   Step 5: Write <split>.json manifests  (write_manifest)
//
// Splitting happens before chunking, so segments of one
// recording never appear in two splits.
//
// The options are stored in `prepare_opts.json`. A later run
// with identical options finds the manifests and skips the
// whole preparation.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::config::Hyperparams;
use crate::data::{
    audio::{probe_wav, read_wav},
    chunker::Chunker,
    corpus::VoxCelebCorpus,
    manifest::write_manifest,
    splitter::split_by_ratio,
    vad::{trim_silence, VadConfig},
};
use crate::domain::segment::{Segment, Utterance};
use crate::domain::traits::CorpusSource;

const OPTS_FILE: &str = "prepare_opts.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareOptions {
    pub data_folder: String,
    pub save_folder: String,
    pub splits:      Vec<String>,
    /// Percentages, one per split
    pub split_ratio: Vec<u32>,
    /// Segment duration in centiseconds
    pub seg_dur:     u32,
    pub vad:         bool,
    pub rand_seed:   u64,
    pub sample_rate: u32,
    #[serde(skip)]
    pub skip_prep:   bool,
}

impl PrepareOptions {
    pub fn from_hparams(hp: &Hyperparams) -> Self {
        let p = &hp.prepare;
        Self {
            data_folder: hp.data_folder.clone(),
            save_folder: hp.save_folder.clone(),
            splits:      p.splits.clone(),
            split_ratio: p.split_ratio.clone(),
            seg_dur:     p.seg_dur,
            vad:         p.vad,
            rand_seed:   p.rand_seed,
            sample_rate: hp.features.sample_rate,
            skip_prep:   p.skip_prep,
        }
    }

    pub fn manifest_path(&self, split: &str) -> PathBuf {
        manifest_path(&self.save_folder, split)
    }
}

pub fn manifest_path(save_folder: impl AsRef<Path>, split: &str) -> PathBuf {
    save_folder.as_ref().join(format!("{split}.json"))
}

/// Where each split's manifest lives and how many segments it holds.
#[derive(Debug, Clone, Default)]
pub struct PreparedCorpus {
    pub manifests: BTreeMap<String, PathBuf>,
    pub segments:  BTreeMap<String, usize>,
    pub skipped:   bool,
}

/// Prepare a VoxCeleb1 directory tree.
pub fn prepare_voxceleb1(opts: &PrepareOptions) -> Result<PreparedCorpus> {
    prepare_from_source(&VoxCelebCorpus::new(&opts.data_folder), opts)
}

/// Prepare manifests from any utterance source.
pub fn prepare_from_source(source: &dyn CorpusSource, opts: &PrepareOptions) -> Result<PreparedCorpus> {
    if opts.splits.len() != opts.split_ratio.len() {
        bail!("{} splits but {} ratios", opts.splits.len(), opts.split_ratio.len());
    }

    if let Some(done) = already_prepared(opts)? {
        tracing::info!("Manifests in '{}' are up to date, skipping preparation", opts.save_folder);
        return Ok(done);
    }

    // ── Step 1: List utterances ──────────────────────────────────────────────
    let utterances = source.load_all()?;
    if utterances.is_empty() {
        bail!("No utterances found in '{}'", opts.data_folder);
    }

    // ── Step 2: Split by utterance ───────────────────────────────────────────
    let parts   = split_by_ratio(utterances, &opts.split_ratio, opts.rand_seed);
    let chunker = Chunker::from_centiseconds(opts.seg_dur, opts.sample_rate);
    let vad_cfg = VadConfig::default();

    fs::create_dir_all(&opts.save_folder)
        .with_context(|| format!("Cannot create save folder '{}'", opts.save_folder))?;

    let mut prepared = PreparedCorpus::default();
    for (split, utts) in opts.splits.iter().zip(parts) {
        // ── Steps 3-4: Trim and chunk ───────────────────────────────────────
        let mut segments = Vec::new();
        for utt in &utts {
            segments.extend(segment_utterance(utt, opts, &chunker, &vad_cfg)?);
        }

        // ── Step 5: Write manifest ───────────────────────────────────────────
        let path = opts.manifest_path(split);
        write_manifest(&path, &segments)?;
        tracing::info!(
            "Split '{}': {} utterances → {} segments",
            split,
            utts.len(),
            segments.len()
        );
        prepared.segments.insert(split.clone(), segments.len());
        prepared.manifests.insert(split.clone(), path);
    }

    let opts_path = Path::new(&opts.save_folder).join(OPTS_FILE);
    fs::write(&opts_path, serde_json::to_string_pretty(opts)?)
        .with_context(|| format!("Cannot write '{}'", opts_path.display()))?;

    Ok(prepared)
}

fn segment_utterance(
    utt:     &Utterance,
    opts:    &PrepareOptions,
    chunker: &Chunker,
    vad_cfg: &VadConfig,
) -> Result<Vec<Segment>> {
    let info = probe_wav(&utt.wav)?;
    if info.sample_rate != opts.sample_rate {
        bail!(
            "'{}' is sampled at {} Hz, expected {} Hz",
            utt.wav,
            info.sample_rate,
            opts.sample_rate
        );
    }
    if info.channels > 1 {
        tracing::debug!("'{}' has {} channels; down-mixing to mono", utt.wav, info.channels);
    }

    let (start, stop) = if opts.vad {
        let (samples, _) = read_wav(&utt.wav)?;
        match trim_silence(&samples, info.sample_rate, vad_cfg) {
            Some(range) => range,
            None => {
                tracing::warn!("Skipping '{}': no speech detected", utt.wav);
                return Ok(Vec::new());
            }
        }
    } else {
        (0, info.num_samples)
    };

    Ok(chunker
        .chunk(start, stop)
        .into_iter()
        .map(|(s, e)| Segment::from_utterance(utt, s, e, opts.sample_rate))
        .collect())
}

fn already_prepared(opts: &PrepareOptions) -> Result<Option<PreparedCorpus>> {
    let all_exist = opts.splits.iter().all(|s| opts.manifest_path(s).is_file());
    if !all_exist {
        return Ok(None);
    }

    if !opts.skip_prep {
        let opts_path = Path::new(&opts.save_folder).join(OPTS_FILE);
        let Ok(json) = fs::read_to_string(&opts_path) else {
            return Ok(None);
        };
        let Ok(saved) = serde_json::from_str::<PrepareOptions>(&json) else {
            return Ok(None);
        };
        let requested = PrepareOptions { skip_prep: false, ..opts.clone() };
        if saved != requested {
            tracing::info!("Preparation options changed, rebuilding manifests");
            return Ok(None);
        }
    }

    let mut prepared = PreparedCorpus { skipped: true, ..Default::default() };
    for split in &opts.splits {
        let path = opts.manifest_path(split);
        let n    = crate::data::manifest::read_manifest(&path)?.len();
        prepared.segments.insert(split.clone(), n);
        prepared.manifests.insert(split.clone(), path);
    }
    Ok(Some(prepared))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::manifest::read_manifest;
    use hound::{SampleFormat, WavSpec, WavWriter};

    struct FixedSource(Vec<Utterance>);

    impl CorpusSource for FixedSource {
        fn load_all(&self) -> Result<Vec<Utterance>> {
            Ok(self.0.clone())
        }
    }

    fn write_wav(path: &Path, samples: &[f32]) {
        let spec = WavSpec {
            channels:        1,
            sample_rate:     16_000,
            bits_per_sample: 16,
            sample_format:   SampleFormat::Int,
        };
        let mut w = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            w.write_sample((s * 32767.0) as i16).unwrap();
        }
        w.finalize().unwrap();
    }

    fn corpus(dir: &Path, n: usize, len: usize) -> Vec<Utterance> {
        (0..n)
            .map(|i| {
                let wav = dir.join(format!("u{i}.wav"));
                let x: Vec<f32> = (0..len).map(|t| (t as f32 * 0.05).sin() * 0.3).collect();
                write_wav(&wav, &x);
                Utterance::new(format!("u{i}"), wav.to_string_lossy(), format!("spk{}", i % 2))
            })
            .collect()
    }

    fn options(dir: &Path) -> PrepareOptions {
        PrepareOptions {
            data_folder: dir.to_string_lossy().into_owned(),
            save_folder: dir.join("save").to_string_lossy().into_owned(),
            splits:      vec!["train".into(), "dev".into()],
            split_ratio: vec![90, 10],
            seg_dur:     50,
            vad:         false,
            rand_seed:   1234,
            sample_rate: 16_000,
            skip_prep:   false,
        }
    }

    #[test]
    fn test_writes_manifests_per_split() {
        let dir  = tempfile::tempdir().unwrap();
        let src  = FixedSource(corpus(dir.path(), 4, 16_000));
        let opts = options(dir.path());

        let prepared = prepare_from_source(&src, &opts).unwrap();
        assert!(!prepared.skipped);
        // 3 train / 1 dev utterances, 1 s each → 2 segments of 0.5 s
        assert_eq!(prepared.segments["train"], 6);
        assert_eq!(prepared.segments["dev"], 2);

        let train = read_manifest(opts.manifest_path("train")).unwrap();
        let dev   = read_manifest(opts.manifest_path("dev")).unwrap();
        assert!(train.iter().all(|s| s.num_samples() == 8000));
        // No recording shared between splits
        assert!(dev.iter().all(|d| train.iter().all(|t| t.wav != d.wav)));
    }

    #[test]
    fn test_second_run_is_skipped() {
        let dir  = tempfile::tempdir().unwrap();
        let src  = FixedSource(corpus(dir.path(), 4, 16_000));
        let opts = options(dir.path());

        prepare_from_source(&src, &opts).unwrap();
        assert!(prepare_from_source(&src, &opts).unwrap().skipped);

        let changed = PrepareOptions { seg_dur: 25, ..opts };
        let again   = prepare_from_source(&src, &changed).unwrap();
        assert!(!again.skipped);
        assert_eq!(again.segments["train"], 12);
    }

    #[test]
    fn test_wrong_sample_rate_is_error() {
        let dir  = tempfile::tempdir().unwrap();
        let src  = FixedSource(corpus(dir.path(), 2, 1600));
        let opts = PrepareOptions { sample_rate: 8000, ..options(dir.path()) };
        assert!(prepare_from_source(&src, &opts).is_err());
    }

    #[test]
    fn test_empty_corpus_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(prepare_from_source(&FixedSource(Vec::new()), &options(dir.path())).is_err());
    }

    #[test]
    fn test_vad_trims_silent_edges() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("padded.wav");
        let mut x = vec![0.0f32; 3200];
        x.extend((0..8000).map(|t| (t as f32 * 0.05).sin() * 0.3));
        x.extend(vec![0.0f32; 3200]);
        write_wav(&wav, &x);

        let utt  = Utterance::new("p", wav.to_string_lossy(), "spk");
        let opts = PrepareOptions {
            vad:         true,
            seg_dur:     100,
            splits:      vec!["train".into()],
            split_ratio: vec![100],
            ..options(dir.path())
        };
        prepare_from_source(&FixedSource(vec![utt]), &opts).unwrap();

        let train = read_manifest(opts.manifest_path("train")).unwrap();
        assert_eq!(train.len(), 1);
        assert_eq!(train[0].start, 3200);
        assert_eq!(train[0].stop, 11_200);
    }
}
