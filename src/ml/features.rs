// ============================================================
// Layer 5 — Feature Pipeline
// ============================================================
// wavs [B, L] + lens [B]
//     │  Fbank on each row            (data::fbank, CPU)
//     ▼
// feats [B, T, n_mels]
//     │  mean (and optionally std) over valid frames only
//     ▼
// normalised feats [B, T, n_mels], padded frames set to zero
//
// `lens` are relative, so the valid frame count of row b is
// round(lens[b] * T). The same mask is reused by statistics
// pooling in the model.

use burn::prelude::*;

use crate::config::{FbankParams, NormParams, NormType};
use crate::data::batcher::InputBatch;
use crate::data::fbank::{Fbank, FbankConfig};

const NORM_EPS: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    fbank: Fbank,
    norm:  NormParams,
}

impl FeaturePipeline {
    pub fn new(fbank: Fbank, norm: NormParams) -> Self {
        Self { fbank, norm }
    }

    pub fn from_params(features: &FbankParams, norm: &NormParams) -> Self {
        Self::new(Fbank::new(FbankConfig::from_params(features)), norm.clone())
    }

    /// Feature dimension fed to the first TDNN layer
    pub fn n_mels(&self) -> usize {
        self.fbank.n_mels()
    }

    /// Features + normalisation for one batch.
    pub fn compute<B: Backend>(&self, inputs: &InputBatch<B>) -> Tensor<B, 3> {
        let feats = self.compute_features(&inputs.wavs);
        self.normalize(feats, &inputs.lens)
    }

    /// Log mel filterbank of every row: [B, T, n_mels].
    pub fn compute_features<B: Backend>(&self, wavs: &Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch_size, num_samples] = wavs.dims();
        let device = wavs.device();
        let frames = self.fbank.config().num_frames(num_samples);
        let n_mels = self.fbank.n_mels();

        let samples: Vec<f32> = wavs.clone().into_data().iter::<f32>().collect();
        let mut flat = Vec::with_capacity(batch_size * frames * n_mels);
        for row in samples.chunks(num_samples.max(1)).take(batch_size) {
            flat.extend(self.fbank.compute(row));
        }

        Tensor::<B, 1>::from_floats(flat.as_slice(), &device).reshape([batch_size, frames, n_mels])
    }

    /// Masked mean/variance normalisation over the time axis.
    pub fn normalize<B: Backend>(&self, feats: Tensor<B, 3>, lens: &Tensor<B, 1>) -> Tensor<B, 3> {
        let [b, t, f] = feats.dims();
        let mask = length_mask(lens, t).reshape([b, t, 1]).expand([b, t, f]);

        // Valid-frame counts broadcast to [B or 1, 1, F]
        let (mean, count) = match self.norm.norm_type {
            NormType::Sentence => {
                let count = mask.clone().sum_dim(1).clamp_min(1.0);
                let mean  = (feats.clone() * mask.clone()).sum_dim(1) / count.clone();
                (mean.expand([b, t, f]), count.expand([b, t, f]))
            }
            NormType::Batch => {
                let count = mask.clone().sum_dim(1).sum_dim(0).clamp_min(1.0);
                let mean  = (feats.clone() * mask.clone()).sum_dim(1).sum_dim(0) / count.clone();
                (mean.expand([b, t, f]), count.expand([b, t, f]))
            }
        };

        let centered = (feats - mean) * mask.clone();
        if !self.norm.std_norm {
            return centered;
        }

        let var = match self.norm.norm_type {
            NormType::Sentence => centered.clone().powf_scalar(2.0).sum_dim(1).expand([b, t, f]),
            NormType::Batch    => centered.clone().powf_scalar(2.0).sum_dim(1).sum_dim(0).expand([b, t, f]),
        } / count;
        centered / var.add_scalar(NORM_EPS).sqrt() * mask
    }
}

/// 1.0 for valid time steps, 0.0 for padding: [B, steps].
///
/// Step t of row b is valid when t + 0.5 <= lens[b] * steps,
/// i.e. the first round(lens[b] * steps) steps.
pub fn length_mask<B: Backend>(lens: &Tensor<B, 1>, steps: usize) -> Tensor<B, 2> {
    let [b]    = lens.dims();
    let device = lens.device();

    let positions = Tensor::<B, 1, Int>::arange(0..steps as i64, &device)
        .float()
        .add_scalar(0.5)
        .reshape([1, steps])
        .expand([b, steps]);
    let valid = lens
        .clone()
        .mul_scalar(steps as f64)
        .reshape([b, 1])
        .expand([b, steps]);

    positions.lower_equal(valid).float()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::SpeakerBatcher;
    use crate::data::dataset::SpeakerItem;
    use burn::data::dataloader::batcher::Batcher;

    type TestBackend = burn::backend::NdArray<f32>;

    fn pipeline(norm_type: NormType, std_norm: bool) -> FeaturePipeline {
        FeaturePipeline::from_params(&FbankParams::default(), &NormParams { norm_type, std_norm })
    }

    fn lens(values: &[f32]) -> Tensor<TestBackend, 1> {
        Tensor::from_floats(values, &Default::default())
    }

    #[test]
    fn test_length_mask_rounds_relative_lengths() {
        let mask: Vec<f32> = length_mask(&lens(&[1.0, 0.5, 0.3]), 4).into_data().to_vec().unwrap();
        assert_eq!(
            mask,
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_feature_shape() {
        let batcher = SpeakerBatcher::<TestBackend>::new(Default::default());
        let items = (0..3)
            .map(|i| SpeakerItem {
                id:        format!("u{i}"),
                samples:   (0..1600 + i * 160).map(|t| (t as f32 * 0.01).sin()).collect(),
                spk_index: 0,
                spk_id:    "s".into(),
            })
            .collect();
        let batch = batcher.batch(items);
        let feats = pipeline(NormType::Sentence, false).compute(&batch.inputs);
        // longest row: 1920 samples → 1 + 1920 / 160 frames
        assert_eq!(feats.dims(), [3, 13, 24]);
    }

    #[test]
    fn test_sentence_norm_zero_mean_over_valid_frames() {
        let feats = Tensor::<TestBackend, 3>::random(
            [2, 10, 4],
            burn::tensor::Distribution::Uniform(2.0, 5.0),
            &Default::default(),
        );
        let out = pipeline(NormType::Sentence, true).normalize(feats, &lens(&[1.0, 0.5]));
        let v: Vec<f32> = out.into_data().to_vec().unwrap();

        for row in 0..2 {
            let valid = if row == 0 { 10 } else { 5 };
            for ch in 0..4 {
                let col: Vec<f32> = (0..valid).map(|t| v[row * 40 + t * 4 + ch]).collect();
                let mean = col.iter().sum::<f32>() / valid as f32;
                let var  = col.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / valid as f32;
                assert!(mean.abs() < 1e-4);
                assert!((var - 1.0).abs() < 1e-3);
            }
            for t in valid..10 {
                assert!((0..4).all(|ch| v[row * 40 + t * 4 + ch] == 0.0));
            }
        }
    }

    #[test]
    fn test_batch_norm_shares_statistics() {
        let device = Default::default();
        let feats  = Tensor::<TestBackend, 3>::from_floats([[[1.0], [1.0]], [[3.0], [3.0]]], &device);
        let out    = pipeline(NormType::Batch, false).normalize(feats, &lens(&[1.0, 1.0]));
        let v: Vec<f32> = out.into_data().to_vec().unwrap();
        assert_eq!(v, vec![-1.0, -1.0, 1.0, 1.0]);
    }
}
