// ============================================================
// Layer 5 — Embedding Extractor
// ============================================================
// Owns the feature pipeline and a truncated trunk. Neither is
// mutated after construction, so repeated calls on the same
// batch return identical embeddings.
//
//   InputBatch ─► FeaturePipeline ─► XvectorEmbedder ─► [B, lin_neurons]

use burn::prelude::*;

use crate::data::batcher::InputBatch;
use crate::ml::{features::FeaturePipeline, model::XvectorEmbedder};

#[derive(Debug)]
pub struct Extractor<B: Backend> {
    features: FeaturePipeline,
    model:    XvectorEmbedder<B>,
}

impl<B: Backend> Extractor<B> {
    pub fn new(features: FeaturePipeline, model: XvectorEmbedder<B>) -> Self {
        Self { features, model }
    }

    /// Embeddings of already-computed features.
    pub fn get_emb(&self, feats: Tensor<B, 3>, lens: &Tensor<B, 1>) -> Tensor<B, 2> {
        self.model.forward(feats, lens).detach()
    }

    /// Features + embeddings for one padded batch.
    pub fn extract(&self, inputs: &InputBatch<B>) -> Tensor<B, 2> {
        let feats = self.features.compute(inputs);
        self.get_emb(feats, &inputs.lens)
    }

    pub fn embedding_dim(&self) -> usize {
        self.model.embedding_dim()
    }
}
