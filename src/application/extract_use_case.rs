// ============================================================
// Layer 2 — ExtractUseCase
// ============================================================
// Reuses the artefacts of a finished training run:
//
//   xvector_config.json  → rebuild XvectorClassifier
//   model_epoch_N.mpk.gz → load the latest weights
//   label_encoder.json   → same speaker table as training
//
// then truncates at the embedding tag and embeds the first
// batch of the valid split.

use anyhow::{anyhow, bail, Context, Result};
use burn::prelude::*;

use crate::application::{build_loader, split_names};
use crate::config::Hyperparams;
use crate::data::{
    dataset::SegmentDataset,
    labels::{label_encoder_path, LabelEncoder},
    prepare::manifest_path,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    extractor::Extractor,
    features::FeaturePipeline,
    model::{LayerTag, XvectorClassifier},
    InferBackend, InferDevice,
};

#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    pub ids:        Vec<String>,
    /// One row of length lin_neurons per id
    pub embeddings: Vec<Vec<f32>>,
    pub shape:      [usize; 2],
}

pub struct ExtractUseCase {
    hparams: Hyperparams,
}

impl ExtractUseCase {
    pub fn new(hparams: Hyperparams) -> Self {
        Self { hparams }
    }

    pub fn execute(&self) -> Result<ExtractOutcome> {
        let hp     = &self.hparams;
        let device = InferDevice::default();

        let ckpt   = CheckpointManager::new(&hp.save_folder)?;
        let cfg    = ckpt.load_config()?;
        let labels = LabelEncoder::load(label_encoder_path(&hp.save_folder))?;
        if cfg.n_speakers < labels.len() {
            bail!(
                "Checkpoint has {} output classes but the label encoder lists {} speakers",
                cfg.n_speakers,
                labels.len()
            );
        }

        let pipeline = FeaturePipeline::from_params(&hp.features, &hp.normalization);
        if pipeline.n_mels() != cfg.input_size {
            bail!(
                "Feature size {} does not match the trained model's input size {}",
                pipeline.n_mels(),
                cfg.input_size
            );
        }

        let model: XvectorClassifier<InferBackend> = cfg.init(&device);
        let model = ckpt.load_model::<InferBackend, _>(model, &device)?;
        let extractor = Extractor::new(pipeline, model.trunk.truncate(LayerTag::Embedding(0))?);

        let (_, valid_split) = split_names(hp)?;
        let dataset = SegmentDataset::from_manifest(
            manifest_path(&hp.save_folder, valid_split),
            &labels,
            hp.features.sample_rate,
        )?;
        let loader = build_loader::<InferBackend>(dataset, hp, false, &device);
        let batch  = loader
            .iter()
            .next()
            .with_context(|| format!("Split '{valid_split}' produced no batches"))?;

        let emb   = extractor.extract(&batch.inputs);
        let shape = emb.dims();
        let flat: Vec<f32> = emb
            .into_data()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read embeddings back: {e:?}"))?;
        tracing::info!("Extracted {} embeddings of size {}", shape[0], shape[1]);

        Ok(ExtractOutcome {
            ids:        batch.inputs.ids,
            embeddings: flat.chunks(shape[1].max(1)).map(<[f32]>::to_vec).collect(),
            shape,
        })
    }
}
