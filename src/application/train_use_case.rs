// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training recipe in order:
//
//   Step 1: Experiment directory           (Layer 6 - infra)
//   Step 2: Corpus preparation             (Layer 4 - data)
//   Step 3: Label encoder over all splits  (Layer 4 - data)
//   Step 4: Datasets and loaders           (Layer 4 - data)
//   Step 5: Build model, save its config   (Layer 5 - ml, Layer 6 - infra)
//   Step 6: fit() with XvectorBrain hooks  (Layer 5 - ml)
//   Step 7: Truncate at the embedding tag  (Layer 5 - ml)
//   Step 8: Extract one valid batch        (Layer 5 - ml)

use anyhow::{bail, Context, Result};
use burn::{module::AutodiffModule, optim::AdamConfig, prelude::*};
use std::path::PathBuf;

use crate::application::{build_loader, split_names};
use crate::config::Hyperparams;
use crate::data::{
    dataset::SegmentDataset,
    labels::{label_encoder_path, LabelEncoder},
    manifest::read_manifest,
    prepare::{manifest_path, prepare_voxceleb1, PrepareOptions},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    experiment::create_experiment_directory,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    brain::{fit, FitOptions, FitReport},
    extractor::Extractor,
    features::FeaturePipeline,
    model::{LayerTag, XvectorConfig},
    xvector_brain::XvectorBrain,
    InferBackend, InferDevice, TrainBackend,
};

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub report:          FitReport,
    /// Shape of the sample embedding batch: [batch_size, lin_neurons]
    pub embedding_shape: [usize; 2],
    /// Position of the embedding layer in the trunk's layer plan
    pub embedding_layer: usize,
}

pub struct TrainUseCase {
    hparams:     Hyperparams,
    params_file: Option<PathBuf>,
    overrides:   Vec<String>,
}

impl TrainUseCase {
    pub fn new(hparams: Hyperparams) -> Self {
        Self { hparams, params_file: None, overrides: Vec::new() }
    }

    /// Record where the hyperparameters came from in the experiment directory.
    pub fn with_source(mut self, params_file: impl Into<PathBuf>, overrides: Vec<String>) -> Self {
        self.params_file = Some(params_file.into());
        self.overrides   = overrides;
        self
    }

    pub fn execute(&self) -> Result<TrainOutcome> {
        let hp     = &self.hparams;
        let device = InferDevice::default();

        // ── Step 1: Experiment directory ──────────────────────────────────────
        create_experiment_directory(hp, self.params_file.as_deref(), &self.overrides)?;

        // ── Step 2: Corpus preparation ────────────────────────────────────────
        let prepared = prepare_voxceleb1(&PrepareOptions::from_hparams(hp))?;
        for (split, n) in &prepared.segments {
            tracing::info!("{split}: {n} segments");
        }

        // ── Step 3: Label encoder ─────────────────────────────────────────────
        let mut all_segments = Vec::new();
        for path in prepared.manifests.values() {
            all_segments.extend(read_manifest(path)?);
        }
        let labels = LabelEncoder::from_segments(&all_segments);
        labels.save(label_encoder_path(&hp.save_folder))?;
        let n_speakers = resolve_n_speakers(hp.n_speakers, labels.len())?;
        tracing::info!("{} speakers, output layer size {}", labels.len(), n_speakers);

        // ── Step 4: Datasets and loaders ──────────────────────────────────────
        let (train_split, valid_split) = split_names(hp)?;
        let sample_rate = hp.features.sample_rate;
        let train_ds = SegmentDataset::from_manifest(manifest_path(&hp.save_folder, train_split), &labels, sample_rate)?;
        let valid_ds = SegmentDataset::from_manifest(manifest_path(&hp.save_folder, valid_split), &labels, sample_rate)?;
        if train_ds.segment_count() == 0 || valid_ds.segment_count() == 0 {
            bail!(
                "Empty split: {} train / {} valid segments",
                train_ds.segment_count(),
                valid_ds.segment_count()
            );
        }

        let train_loader = build_loader::<TrainBackend>(train_ds, hp, hp.shuffle, &device);
        let valid_loader = build_loader::<InferBackend>(valid_ds, hp, false, &device);

        // ── Step 5: Build model ───────────────────────────────────────────────
        <TrainBackend as Backend>::seed(hp.seed);
        let pipeline  = FeaturePipeline::from_params(&hp.features, &hp.normalization);
        let model_cfg = XvectorConfig::from_params(pipeline.n_mels(), n_speakers, &hp.model);
        let model     = model_cfg.init::<TrainBackend>(&device);

        let ckpt = CheckpointManager::new(&hp.save_folder)?;
        ckpt.save_config(&model_cfg)?;
        let metrics = MetricsLogger::new(&hp.output_folder)?;

        // ── Step 6: fit ───────────────────────────────────────────────────────
        // m = β1*m + (1-β1)*g        (mean)
        // v = β2*v + (1-β2)*g²       (variance)
        // θ = θ - lr * m / (√v + ε)  (update)
        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
        let brain     = XvectorBrain::new(pipeline.clone());
        let opts      = FitOptions { epochs: hp.number_of_epochs, lr: hp.lr };

        let (model, report) = fit(
            &brain,
            model,
            &mut optim,
            &opts,
            train_loader.as_ref(),
            valid_loader.as_ref(),
            |epoch, model, summary| {
                ckpt.save_model::<TrainBackend, _>(model, epoch)?;
                metrics.log(&EpochMetrics::from(summary))
            },
        )?;
        println!("Xvector model training completed!");

        // ── Step 7: Truncate ──────────────────────────────────────────────────
        let trunk = model.valid().trunk;
        let tag   = LayerTag::Embedding(0);
        let embedding_layer = trunk
            .layer_index(tag)
            .with_context(|| format!("Trunk has no {tag:?} layer"))?;
        let extractor = Extractor::new(pipeline, trunk.truncate(tag)?);
        tracing::info!("Embedding taken after layer {}", embedding_layer);
        println!("Model has been truncated!");

        // ── Step 8: Sample extraction ─────────────────────────────────────────
        let batch = valid_loader
            .iter()
            .next()
            .context("Validation loader produced no batches")?;
        println!("Extracting Xvector from a sample validation batch using truncated model!");
        let embedding_shape = extractor.extract(&batch.inputs).dims();
        println!("Extracted Xvector.Shape: {embedding_shape:?}");

        Ok(TrainOutcome { report, embedding_shape, embedding_layer })
    }
}

fn resolve_n_speakers(configured: Option<usize>, found: usize) -> Result<usize> {
    if found == 0 {
        bail!("No speakers found in the manifests");
    }
    match configured {
        Some(n) if n < found => bail!("n_speakers is {n} but the manifests contain {found} speakers"),
        Some(n) => Ok(n),
        None    => Ok(found),
    }
}

/// Fails unless training drove the average loss below `threshold`.
pub fn check_overfit(avg_train_loss: f64, threshold: f64) -> Result<()> {
    if !(avg_train_loss < threshold) {
        bail!("Average training loss {avg_train_loss:.4} is not below {threshold}");
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_overfit() {
        assert!(check_overfit(0.05, 0.1).is_ok());
        assert!(check_overfit(0.1, 0.1).is_err());
        assert!(check_overfit(f64::NAN, 0.1).is_err());
    }

    #[test]
    fn test_resolve_n_speakers() {
        assert_eq!(resolve_n_speakers(None, 4).unwrap(), 4);
        assert_eq!(resolve_n_speakers(Some(10), 4).unwrap(), 10);
        assert!(resolve_n_speakers(Some(2), 4).is_err());
        assert!(resolve_n_speakers(None, 0).is_err());
    }
}
