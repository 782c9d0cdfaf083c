// ============================================================
// Configuration — Hyperparameters
// ============================================================
// Typed view of the recipe's YAML file. Every section has
// defaults matching the VoxCeleb1 x-vector recipe, so a minimal
// params file only needs `data_folder` and `output_folder`.
//
// Example:
//   seed: 1234
//   output_folder: results/xvector/<seed>
//   data_folder: /data/voxceleb1
//   number_of_epochs: 10
//   model:
//     lin_neurons: 512

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::{fs, path::Path};

use super::overrides::{apply_overrides, resolve_references};

// ─── Hyperparams ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hyperparams {
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Experiment directory (params copy, metrics)
    pub output_folder: String,

    /// Manifests, label encoder and checkpoints
    pub save_folder: String,

    /// Root of the raw corpus
    pub data_folder: String,

    #[serde(default = "default_epochs")]
    pub number_of_epochs: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Adam learning rate
    #[serde(default = "default_lr")]
    pub lr: f64,

    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Shuffle the training set every epoch
    #[serde(default = "default_true")]
    pub shuffle: bool,

    /// Output layer size; derived from the label encoder when absent
    #[serde(default)]
    pub n_speakers: Option<usize>,

    #[serde(default)]
    pub prepare: PrepareParams,

    #[serde(default)]
    pub features: FbankParams,

    #[serde(default)]
    pub normalization: NormParams,

    #[serde(default)]
    pub model: ModelParams,
}

fn default_seed() -> u64         { 1234 }
fn default_epochs() -> usize     { 10 }
fn default_batch_size() -> usize { 8 }
fn default_lr() -> f64           { 1e-3 }
fn default_num_workers() -> usize { 1 }
fn default_true() -> bool        { true }

// ─── PrepareParams ────────────────────────────────────────────────────────────
/// Arguments forwarded to the corpus preparer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrepareParams {
    pub splits:      Vec<String>,
    /// Percentages, one per split, summing to 100
    pub split_ratio: Vec<u32>,
    /// Segment duration in centiseconds (300 = 3.0 s)
    pub seg_dur:     u32,
    /// Trim leading/trailing silence before chunking
    pub vad:         bool,
    pub rand_seed:   u64,
    /// Reuse existing manifests without checking their options
    pub skip_prep:   bool,
}

impl Default for PrepareParams {
    fn default() -> Self {
        Self {
            splits:      vec!["train".to_string(), "dev".to_string()],
            split_ratio: vec![90, 10],
            seg_dur:     300,
            vad:         false,
            rand_seed:   1234,
            skip_prep:   false,
        }
    }
}

// ─── FbankParams ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FbankParams {
    pub sample_rate:   u32,
    pub n_mels:        usize,
    pub win_length_ms: f64,
    pub hop_length_ms: f64,
    pub f_min:         f64,
    /// Upper mel edge; Nyquist when absent
    pub f_max:         Option<f64>,
}

impl Default for FbankParams {
    fn default() -> Self {
        Self {
            sample_rate:   16_000,
            n_mels:        24,
            win_length_ms: 25.0,
            hop_length_ms: 10.0,
            f_min:         0.0,
            f_max:         None,
        }
    }
}

// ─── NormParams ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormType {
    /// Statistics over the valid frames of each utterance
    Sentence,
    /// Statistics over all valid frames of the batch
    Batch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormParams {
    pub norm_type: NormType,
    /// Also divide by the standard deviation
    pub std_norm:  bool,
}

impl Default for NormParams {
    fn default() -> Self {
        Self { norm_type: NormType::Sentence, std_norm: false }
    }
}

// ─── ModelParams ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelParams {
    pub tdnn_channels:     Vec<usize>,
    pub tdnn_kernel_sizes: Vec<usize>,
    pub tdnn_dilations:    Vec<usize>,
    /// Embedding dimensionality
    pub lin_neurons:       usize,
    pub lin_blocks:        usize,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            tdnn_channels:     vec![512, 512, 512, 512, 1500],
            tdnn_kernel_sizes: vec![5, 3, 3, 1, 1],
            tdnn_dilations:    vec![1, 2, 3, 1, 1],
            lin_neurons:       512,
            lin_blocks:        1,
        }
    }
}

// ─── Loading ──────────────────────────────────────────────────────────────────
impl Hyperparams {
    /// Read a YAML params file and apply command-line overrides.
    pub fn load(path: impl AsRef<Path>, overrides: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read params file '{}'", path.display()))?;
        Self::from_yaml_str(&text, overrides)
            .with_context(|| format!("Invalid params file '{}'", path.display()))
    }

    /// Parse a YAML document, apply overrides, resolve references, validate.
    pub fn from_yaml_str(text: &str, overrides: &[String]) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).context("Malformed YAML")?;
        let mut root = match value {
            Value::Mapping(m) => m,
            Value::Null       => Mapping::new(),
            _ => bail!("Params document must be a mapping at the top level"),
        };

        apply_overrides(&mut root, overrides)?;

        // Defaulted scalars must be visible to `<key>` references.
        let defaults = [
            ("save_folder",      Value::String("<output_folder>/save".to_string())),
            ("seed",             Value::from(default_seed())),
            ("number_of_epochs", Value::from(default_epochs() as u64)),
            ("batch_size",       Value::from(default_batch_size() as u64)),
            ("lr",               Value::from(default_lr())),
            ("num_workers",      Value::from(default_num_workers() as u64)),
            ("shuffle",          Value::from(default_true())),
        ];
        for (key, value) in defaults {
            let key = Value::String(key.to_string());
            if !root.contains_key(&key) {
                root.insert(key, value);
            }
        }
        resolve_references(&mut root)?;

        let hparams: Hyperparams =
            serde_yaml::from_value(Value::Mapping(root)).context("Missing or invalid keys")?;
        hparams.validate()?;
        Ok(hparams)
    }

    /// Serialise the fully resolved parameters (defaults included).
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.number_of_epochs == 0 {
            bail!("number_of_epochs must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if !(self.lr > 0.0) {
            bail!("lr must be positive, got {}", self.lr);
        }

        let p = &self.prepare;
        if p.splits.len() != p.split_ratio.len() {
            bail!(
                "prepare.splits has {} entries but prepare.split_ratio has {}",
                p.splits.len(),
                p.split_ratio.len()
            );
        }
        if p.split_ratio.iter().sum::<u32>() != 100 {
            bail!("prepare.split_ratio must sum to 100, got {:?}", p.split_ratio);
        }
        if p.seg_dur == 0 {
            bail!("prepare.seg_dur must be positive");
        }

        let f = &self.features;
        if f.n_mels == 0 || f.win_length_ms <= 0.0 || f.hop_length_ms <= 0.0 {
            bail!("features: n_mels, win_length_ms and hop_length_ms must be positive");
        }

        let m = &self.model;
        if m.tdnn_channels.is_empty() {
            bail!("model.tdnn_channels must not be empty");
        }
        if m.tdnn_channels.len() != m.tdnn_kernel_sizes.len()
            || m.tdnn_channels.len() != m.tdnn_dilations.len()
        {
            bail!("model.tdnn_channels, tdnn_kernel_sizes and tdnn_dilations must have equal length");
        }
        if m.tdnn_kernel_sizes.iter().any(|&k| k == 0 || k % 2 == 0) {
            bail!("model.tdnn_kernel_sizes must be odd, got {:?}", m.tdnn_kernel_sizes);
        }
        if m.lin_blocks == 0 || m.lin_neurons == 0 {
            bail!("model.lin_blocks and model.lin_neurons must be at least 1");
        }
        Ok(())
    }
}
