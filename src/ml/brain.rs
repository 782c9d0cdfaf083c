// ============================================================
// Layer 5 — Training Orchestrator
// ============================================================
// A generic epoch loop over any model, driven by a `Brain`:
//
//   for epoch in 1..=epochs
//     train: forward → objectives → backward → Adam step
//     valid: model.valid() → forward → objectives (no gradients)
//     on_epoch_end(train stats, valid stats)
//     on_checkpoint(epoch, model, summary)
//
// The hooks see the batch, the model and the stage. The loop
// owns the optimiser, the data loaders and the stage statistics.
//
// Training runs on an AutodiffBackend B; validation runs on
// B::InnerBackend so the brain is implemented for both.

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoader,
    module::{AutodiffModule, Module},
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::collections::BTreeMap;

use crate::data::batcher::{InputBatch, SpeakerBatch, TargetBatch};
use crate::domain::stage::Stage;

/// Scalar metrics reported by one batch, keyed by name.
pub type BatchStats = BTreeMap<String, f64>;

/// Output of `compute_forward` for one batch.
#[derive(Debug, Clone)]
pub struct Predictions<B: Backend> {
    /// Log class probabilities — shape: [batch_size, n_classes]
    pub outputs: Tensor<B, 2>,
    pub lens:    Tensor<B, 1>,
}

/// Task-specific hooks called by `fit`.
pub trait Brain<B: Backend> {
    type Model: Module<B>;

    fn compute_forward(&self, model: &Self::Model, inputs: &InputBatch<B>, stage: Stage) -> Predictions<B>;

    /// Scalar loss of the batch plus any extra metrics.
    fn compute_objectives(
        &self,
        predictions: Predictions<B>,
        targets:     &TargetBatch<B>,
        stage:       Stage,
    ) -> (Tensor<B, 1>, BatchStats);

    fn on_epoch_end(&self, _epoch: usize, _train: &StageStats, _valid: &StageStats) {}
}

// ─── Stage statistics ─────────────────────────────────────────────────────────
/// Per-batch values collected over one stage of one epoch.
#[derive(Debug, Clone, Default)]
pub struct StageStats {
    values: BTreeMap<String, Vec<f64>>,
}

impl StageStats {
    pub fn push(&mut self, key: &str, value: f64) {
        self.values.entry(key.to_string()).or_default().push(value);
    }

    pub fn extend(&mut self, stats: BatchStats) {
        for (key, value) in stats {
            self.push(&key, value);
        }
    }

    pub fn values(&self, key: &str) -> &[f64] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mean of the batch values recorded under `key`.
    pub fn summarize_average(&self, key: &str) -> Option<f64> {
        let v = self.values(key);
        (!v.is_empty()).then(|| summarize_average(v))
    }

    pub fn num_batches(&self) -> usize {
        self.values("loss").len()
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub fn summarize_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// ─── Reports ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    pub epoch:       usize,
    pub train_loss:  f64,
    pub valid_loss:  Option<f64>,
    pub valid_error: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FitReport {
    pub epochs: Vec<EpochSummary>,
    /// Mean training loss of the final epoch
    pub avg_train_loss: f64,
}

#[derive(Debug, Clone)]
pub struct FitOptions {
    pub epochs: usize,
    pub lr:     f64,
}

// ─── fit ──────────────────────────────────────────────────────────────────────
/// Train `model` for `opts.epochs` epochs and return it with a report.
pub fn fit<B, M, H, O, F>(
    brain:         &H,
    mut model:     M,
    optim:         &mut O,
    opts:          &FitOptions,
    train_loader:  &dyn DataLoader<SpeakerBatch<B>>,
    valid_loader:  &dyn DataLoader<SpeakerBatch<B::InnerBackend>>,
    mut on_checkpoint: F,
) -> Result<(M, FitReport)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    H: Brain<B, Model = M> + Brain<B::InnerBackend, Model = <M as AutodiffModule<B>>::InnerModule>,
    O: Optimizer<M, B>,
    F: FnMut(usize, &M, &EpochSummary) -> Result<()>,
{
    let mut epochs = Vec::with_capacity(opts.epochs);

    for epoch in 1..=opts.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_stats = StageStats::default();

        for batch in train_loader.iter() {
            let preds = <H as Brain<B>>::compute_forward(brain, &model, &batch.inputs, Stage::Train);
            let (loss, stats) =
                <H as Brain<B>>::compute_objectives(brain, preds, &batch.targets, Stage::Train);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                bail!("Training loss became {loss_val} at epoch {epoch}");
            }
            train_stats.push("loss", loss_val);
            train_stats.extend(stats);

            // Backward pass + optimiser update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(opts.lr, model, grads);
        }

        let Some(train_loss) = train_stats.summarize_average("loss") else {
            bail!("Training set produced no batches");
        };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut valid_stats = StageStats::default();

        for batch in valid_loader.iter() {
            let preds = <H as Brain<B::InnerBackend>>::compute_forward(
                brain,
                &model_valid,
                &batch.inputs,
                Stage::Valid,
            );
            let (loss, stats) = <H as Brain<B::InnerBackend>>::compute_objectives(
                brain,
                preds,
                &batch.targets,
                Stage::Valid,
            );
            valid_stats.push("loss", loss.into_scalar().elem::<f64>());
            valid_stats.extend(stats);
        }

        <H as Brain<B>>::on_epoch_end(brain, epoch, &train_stats, &valid_stats);

        let summary = EpochSummary {
            epoch,
            train_loss,
            valid_loss:  valid_stats.summarize_average("loss"),
            valid_error: valid_stats.summarize_average("error"),
        };
        on_checkpoint(epoch, &model, &summary)?;
        epochs.push(summary);
    }

    let avg_train_loss = epochs.last().map(|e| e.train_loss).unwrap_or(f64::NAN);
    Ok((model, FitReport { epochs, avg_train_loss }))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_average() {
        assert_eq!(summarize_average(&[1.0, 2.0, 6.0]), 3.0);
        assert!(summarize_average(&[]).is_nan());
    }

    #[test]
    fn test_stage_stats_collects_per_key() {
        let mut stats = StageStats::default();
        stats.push("loss", 2.0);
        stats.push("loss", 4.0);
        stats.extend(BatchStats::from([("error".to_string(), 0.5)]));

        assert_eq!(stats.num_batches(), 2);
        assert_eq!(stats.summarize_average("loss"), Some(3.0));
        assert_eq!(stats.summarize_average("error"), Some(0.5));
        assert_eq!(stats.summarize_average("missing"), None);
    }
}
