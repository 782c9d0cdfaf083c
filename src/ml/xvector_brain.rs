// ============================================================
// Layer 5 — Speaker Classification Hooks
// ============================================================
// compute_forward:    wavs → FeaturePipeline → XvectorClassifier
// compute_objectives: NLL against speaker indices; the valid
//                     stage also reports classification error
// on_epoch_end:       epoch summary on stdout and in the log

use burn::prelude::*;

use crate::data::batcher::{InputBatch, TargetBatch};
use crate::domain::stage::Stage;
use crate::ml::{
    brain::{BatchStats, Brain, Predictions, StageStats},
    features::FeaturePipeline,
    model::XvectorClassifier,
    objectives::{classification_error, nll_loss},
};

#[derive(Debug, Clone)]
pub struct XvectorBrain {
    pub features: FeaturePipeline,
}

impl XvectorBrain {
    pub fn new(features: FeaturePipeline) -> Self {
        Self { features }
    }
}

impl<B: Backend> Brain<B> for XvectorBrain {
    type Model = XvectorClassifier<B>;

    fn compute_forward(&self, model: &Self::Model, inputs: &InputBatch<B>, _stage: Stage) -> Predictions<B> {
        let feats = self.features.compute(inputs);
        Predictions { outputs: model.forward(feats, &inputs.lens), lens: inputs.lens.clone() }
    }

    fn compute_objectives(
        &self,
        predictions: Predictions<B>,
        targets:     &TargetBatch<B>,
        stage:       Stage,
    ) -> (Tensor<B, 1>, BatchStats) {
        let mut stats = BatchStats::new();
        if !stage.is_train() {
            stats.insert(
                "error".to_string(),
                classification_error(predictions.outputs.clone(), targets.spk.clone()),
            );
        }
        (nll_loss(predictions.outputs, targets.spk.clone()), stats)
    }

    fn on_epoch_end(&self, epoch: usize, train: &StageStats, valid: &StageStats) {
        let train_loss  = train.summarize_average("loss").unwrap_or(f64::NAN);
        let valid_loss  = valid.summarize_average("loss").unwrap_or(f64::NAN);
        let valid_error = valid.summarize_average("error").unwrap_or(f64::NAN);

        println!("Epoch {epoch} complete");
        println!("Train loss: {train_loss:.2}");
        println!("Valid loss: {valid_loss:.2}");
        println!("Valid error: {valid_error:.2}");
        tracing::info!(
            "epoch={} train_loss={:.4} valid_loss={:.4} valid_error={:.4}",
            epoch,
            train_loss,
            valid_loss,
            valid_error
        );
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FbankParams, NormParams};
    use crate::data::{batcher::SpeakerBatcher, dataset::SpeakerItem};
    use crate::ml::{
        brain::{fit, FitOptions},
        model::XvectorConfig,
    };
    use burn::{
        backend::Autodiff,
        data::{
            dataloader::{batcher::Batcher, DataLoaderBuilder},
            dataset::InMemDataset,
        },
        optim::AdamConfig,
    };

    type Inner = burn::backend::NdArray<f32>;
    type Train = Autodiff<Inner>;

    fn tone_items() -> Vec<SpeakerItem> {
        (0..8)
            .map(|i| {
                let spk  = i % 2;
                let freq = if spk == 0 { 300.0 } else { 2500.0 };
                let len  = 3200 + 160 * (i / 2);
                SpeakerItem {
                    id:        format!("utt{i}"),
                    samples:   (0..len)
                        .map(|t| (2.0 * std::f32::consts::PI * freq * t as f32 / 16_000.0).sin() * 0.5)
                        .collect(),
                    spk_index: spk,
                    spk_id:    format!("spk{spk}"),
                }
            })
            .collect()
    }

    fn brain() -> XvectorBrain {
        XvectorBrain::new(FeaturePipeline::from_params(&FbankParams::default(), &NormParams::default()))
    }

    fn config() -> XvectorConfig {
        XvectorConfig::new(24, 2, vec![16, 16], vec![3, 1], vec![1, 1], 8, 1)
    }

    #[test]
    fn test_objectives_are_well_formed() {
        let device = Default::default();
        let batch  = SpeakerBatcher::<Inner>::new(device).batch(tone_items());
        let model  = config().init::<Inner>(&device);
        let brain  = brain();

        let preds = brain.compute_forward(&model, &batch.inputs, Stage::Valid);
        assert_eq!(preds.outputs.dims(), [8, 2]);
        assert_eq!(preds.lens.dims(), [8]);

        let (loss, stats) = brain.compute_objectives(preds, &batch.targets, Stage::Valid);
        let loss = loss.into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss >= 0.0);
        assert!((0.0..=1.0).contains(&stats["error"]));
    }

    #[test]
    fn test_train_stage_reports_no_error_metric() {
        let device = Default::default();
        let batch  = SpeakerBatcher::<Inner>::new(device).batch(tone_items());
        let model  = config().init::<Inner>(&device);
        let brain  = brain();

        let preds      = brain.compute_forward(&model, &batch.inputs, Stage::Train);
        let (_, stats) = brain.compute_objectives(preds, &batch.targets, Stage::Train);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_fit_reduces_training_loss() {
        <Train as Backend>::seed(7);
        let device = Default::default();
        let train  = DataLoaderBuilder::new(SpeakerBatcher::<Train>::new(device))
            .batch_size(8)
            .build(InMemDataset::new(tone_items()));
        let valid  = DataLoaderBuilder::new(SpeakerBatcher::<Inner>::new(device))
            .batch_size(8)
            .build(InMemDataset::new(tone_items()));

        let mut optim   = AdamConfig::new().init();
        let mut calls   = 0usize;
        let (_, report) = fit(
            &brain(),
            config().init::<Train>(&device),
            &mut optim,
            &FitOptions { epochs: 15, lr: 0.01 },
            train.as_ref(),
            valid.as_ref(),
            |_, _, _| {
                calls += 1;
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(calls, 15);
        assert_eq!(report.epochs.len(), 15);
        assert!(report.avg_train_loss < report.epochs[0].train_loss);
        assert!(report.epochs.iter().all(|e| e.valid_error.is_some()));
    }
}
