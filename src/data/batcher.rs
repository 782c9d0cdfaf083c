// ============================================================
// Layer 4 — Speaker Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<SpeakerItem>
// into the (inputs, targets) pair the training hooks consume:
//
//   inputs:  (utterance ids, wavs [B, L], lens [B])
//   targets: (utterance ids, speaker index [B], speaker labels)
//
// Waveforms are zero-padded to the longest item of the batch.
// `lens` holds relative lengths in (0, 1]: item_len / L. Every
// later stage (features, normalisation, pooling) maps them onto
// its own time axis.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::SpeakerItem;

/// Network inputs of one batch.
#[derive(Debug, Clone)]
pub struct InputBatch<B: Backend> {
    pub ids:  Vec<String>,
    /// Zero-padded waveforms — shape: [batch_size, max_len]
    pub wavs: Tensor<B, 2>,
    /// Relative valid lengths — shape: [batch_size]
    pub lens: Tensor<B, 1>,
}

/// Supervision of one batch.
#[derive(Debug, Clone)]
pub struct TargetBatch<B: Backend> {
    pub ids:     Vec<String>,
    /// Speaker class indices — shape: [batch_size]
    pub spk:     Tensor<B, 1, Int>,
    pub spk_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SpeakerBatch<B: Backend> {
    pub inputs:  InputBatch<B>,
    pub targets: TargetBatch<B>,
}

impl<B: Backend> SpeakerBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.inputs.ids.len()
    }
}

#[derive(Clone, Debug)]
pub struct SpeakerBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SpeakerBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SpeakerItem, SpeakerBatch<B>> for SpeakerBatcher<B> {
    fn batch(&self, items: Vec<SpeakerItem>) -> SpeakerBatch<B> {
        let batch_size = items.len();
        let max_len    = items.iter().map(|i| i.samples.len()).max().unwrap_or(0).max(1);

        // ── Pad and flatten waveforms ─────────────────────────────────────────
        let mut wav_flat = vec![0.0f32; batch_size * max_len];
        for (row, item) in items.iter().enumerate() {
            wav_flat[row * max_len..row * max_len + item.samples.len()].copy_from_slice(&item.samples);
        }

        let lens: Vec<f32> = items
            .iter()
            .map(|i| i.samples.len() as f32 / max_len as f32)
            .collect();

        let spk: Vec<i32> = items.iter().map(|i| i.spk_index as i32).collect();

        let wavs = Tensor::<B, 1>::from_floats(wav_flat.as_slice(), &self.device)
            .reshape([batch_size, max_len]);
        let lens = Tensor::<B, 1>::from_floats(lens.as_slice(), &self.device);
        let spk  = Tensor::<B, 1, Int>::from_ints(spk.as_slice(), &self.device);

        let ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();

        SpeakerBatch {
            inputs: InputBatch { ids: ids.clone(), wavs, lens },
            targets: TargetBatch {
                ids,
                spk,
                spk_ids: items.into_iter().map(|i| i.spk_id).collect(),
            },
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    fn item(id: &str, len: usize, spk: usize) -> SpeakerItem {
        SpeakerItem {
            id:        id.to_string(),
            samples:   vec![1.0; len],
            spk_index: spk,
            spk_id:    format!("spk{spk}"),
        }
    }

    #[test]
    fn test_pads_to_longest_and_sets_relative_lens() {
        let batcher = SpeakerBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![item("a", 4, 0), item("b", 2, 1)]);

        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.inputs.wavs.dims(), [2, 4]);

        let wavs: Vec<f32> = batch.inputs.wavs.into_data().to_vec().unwrap();
        assert_eq!(wavs, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);

        let lens: Vec<f32> = batch.inputs.lens.into_data().to_vec().unwrap();
        assert_eq!(lens, vec![1.0, 0.5]);

        assert_eq!(batch.targets.spk_ids, vec!["spk0", "spk1"]);
        assert_eq!(batch.targets.ids, batch.inputs.ids);
    }
}
