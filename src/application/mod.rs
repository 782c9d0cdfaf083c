// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers into the two entry points:
//
//   train_use_case.rs   — prepare → label → fit → truncate → sample
//                         extraction
//   extract_use_case.rs — reload the last checkpoint, truncate and
//                         extract embeddings for the valid split
//
// No tensor math here, only workflow coordination.

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};
use std::sync::Arc;

use crate::config::Hyperparams;
use crate::data::{
    batcher::{SpeakerBatch, SpeakerBatcher},
    dataset::SegmentDataset,
};

/// The training workflow
pub mod train_use_case;

/// Embedding extraction from a saved checkpoint
pub mod extract_use_case;

/// Names of the (train, valid) splits: the first two configured splits.
pub(crate) fn split_names(hp: &Hyperparams) -> Result<(&str, &str)> {
    match hp.prepare.splits.as_slice() {
        [train, valid, ..] => Ok((train.as_str(), valid.as_str())),
        other => bail!("Need a train and a valid split, got {:?}", other),
    }
}

pub(crate) fn build_loader<B: Backend>(
    dataset: SegmentDataset,
    hp:      &Hyperparams,
    shuffle: bool,
    device:  &B::Device,
) -> Arc<dyn DataLoader<SpeakerBatch<B>>> {
    let mut builder = DataLoaderBuilder::new(SpeakerBatcher::<B>::new(device.clone()))
        .batch_size(hp.batch_size);
    if shuffle {
        builder = builder.shuffle(hp.seed);
    }
    if hp.num_workers > 0 {
        builder = builder.num_workers(hp.num_workers);
    }
    builder.build(dataset)
}
