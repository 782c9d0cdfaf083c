// ============================================================
// Layer 5 — x-vector Architecture
// ============================================================
// feats [B, T, n_mels]
//   │  swap to [B, n_mels, T]
//   ▼
// TDNN block × N      Conv1d(dilated, same padding) → LeakyReLU → BatchNorm
//   ▼
// Statistics pooling  masked mean ‖ masked std over time → [B, 2C]
//   ▼
// Dense block × M     Linear → LeakyReLU → BatchNorm
//   ▼
// Classifier head     Linear(lin_neurons → n_speakers) → log-softmax
//
// The first Linear of the dense stack is the embedding layer.
// Its position in the flattened layer list is exposed through
// `LayerTag::Embedding(0)`; with the default five TDNN blocks it
// sits at index 16. Truncation cuts the trunk right after it and
// returns an `XvectorEmbedder` that owns copies of the kept layers.

use anyhow::{bail, Result};
use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        BatchNorm, BatchNormConfig,
        Linear, LinearConfig,
        PaddingConfig1d,
    },
    prelude::*,
    tensor::activation::{leaky_relu, log_softmax},
};

use crate::config::ModelParams;
use crate::ml::features::length_mask;

const LEAKY_SLOPE: f64 = 0.01;
const POOL_EPS: f64 = 1e-5;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct XvectorConfig {
    /// Feature dimension (n_mels)
    pub input_size:        usize,
    /// Output classes of the training head
    pub n_speakers:        usize,
    pub tdnn_channels:     Vec<usize>,
    pub tdnn_kernel_sizes: Vec<usize>,
    pub tdnn_dilations:    Vec<usize>,
    pub lin_neurons:       usize,
    pub lin_blocks:        usize,
}

impl XvectorConfig {
    pub fn from_params(input_size: usize, n_speakers: usize, p: &ModelParams) -> Self {
        Self::new(
            input_size,
            n_speakers,
            p.tdnn_channels.clone(),
            p.tdnn_kernel_sizes.clone(),
            p.tdnn_dilations.clone(),
            p.lin_neurons,
            p.lin_blocks,
        )
    }

    /// Trunk + classification head.
    pub fn init<B: Backend>(&self, device: &B::Device) -> XvectorClassifier<B> {
        XvectorClassifier {
            trunk:      self.init_trunk(device),
            out_linear: LinearConfig::new(self.lin_neurons, self.n_speakers).init(device),
        }
    }

    pub fn init_trunk<B: Backend>(&self, device: &B::Device) -> Xvector<B> {
        let mut in_channels = self.input_size;
        let mut tdnn = Vec::with_capacity(self.tdnn_channels.len());
        for ((&out, &kernel), &dilation) in self
            .tdnn_channels
            .iter()
            .zip(&self.tdnn_kernel_sizes)
            .zip(&self.tdnn_dilations)
        {
            // Odd kernels keep T unchanged with this padding
            let padding = dilation * (kernel - 1) / 2;
            let conv = Conv1dConfig::new(in_channels, out, kernel)
                .with_dilation(dilation)
                .with_padding(PaddingConfig1d::Explicit(padding))
                .init(device);
            let norm = BatchNormConfig::new(out).init(device);
            tdnn.push(TdnnBlock { conv, norm });
            in_channels = out;
        }

        let mut in_features = 2 * in_channels;
        let mut dense = Vec::with_capacity(self.lin_blocks);
        for _ in 0..self.lin_blocks {
            dense.push(DenseBlock {
                linear: LinearConfig::new(in_features, self.lin_neurons).init(device),
                norm:   BatchNormConfig::new(self.lin_neurons).init(device),
            });
            in_features = self.lin_neurons;
        }

        Xvector { tdnn, dense }
    }
}

// ─── Building blocks ──────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TdnnBlock<B: Backend> {
    pub conv: Conv1d<B>,
    pub norm: BatchNorm<B, 1>,
}

impl<B: Backend> TdnnBlock<B> {
    /// [B, C_in, T] → [B, C_out, T]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.norm.forward(leaky_relu(self.conv.forward(x), LEAKY_SLOPE))
    }
}

#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    pub linear: Linear<B>,
    pub norm:   BatchNorm<B, 1>,
}

impl<B: Backend> DenseBlock<B> {
    /// [B, D_in] → [B, D_out]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let h = leaky_relu(self.linear.forward(x), LEAKY_SLOPE);
        let [b, d] = h.dims();
        // BatchNorm<_, 1> wants [B, C, L]
        self.norm.forward(h.reshape([b, d, 1])).reshape([b, d])
    }
}

/// Masked mean and standard deviation over time, concatenated.
///
/// x: [B, C, T], lens: relative lengths [B] → [B, 2C]
pub fn statistics_pooling<B: Backend>(x: Tensor<B, 3>, lens: &Tensor<B, 1>) -> Tensor<B, 2> {
    let [b, c, t] = x.dims();
    let mask  = length_mask(lens, t).reshape([b, 1, t]).expand([b, c, t]);
    let count = mask.clone().sum_dim(2).clamp_min(1.0);

    let mean = (x.clone() * mask.clone()).sum_dim(2) / count.clone();
    let diff = (x - mean.clone().expand([b, c, t])) * mask;
    let std  = (diff.powf_scalar(2.0).sum_dim(2) / count).add_scalar(POOL_EPS).sqrt();

    Tensor::cat(vec![mean, std], 1).reshape([b, 2 * c])
}

// ─── Layer bookkeeping ────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Conv1d,
    LeakyRelu,
    BatchNorm,
    StatisticsPooling,
    Linear,
}

/// Named cut points of the trunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerTag {
    /// Linear layer of dense block `n`
    Embedding(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerInfo {
    pub kind: LayerKind,
    pub tag:  Option<LayerTag>,
}

fn layer_plan(tdnn_blocks: usize, dense_blocks: usize) -> Vec<LayerInfo> {
    let plain = |kind| LayerInfo { kind, tag: None };
    let mut plan = Vec::with_capacity(3 * (tdnn_blocks + dense_blocks) + 1);
    for _ in 0..tdnn_blocks {
        plan.extend([plain(LayerKind::Conv1d), plain(LayerKind::LeakyRelu), plain(LayerKind::BatchNorm)]);
    }
    plan.push(plain(LayerKind::StatisticsPooling));
    for n in 0..dense_blocks {
        plan.push(LayerInfo { kind: LayerKind::Linear, tag: Some(LayerTag::Embedding(n)) });
        plan.extend([plain(LayerKind::LeakyRelu), plain(LayerKind::BatchNorm)]);
    }
    plan
}

// ─── Trunk ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Xvector<B: Backend> {
    pub tdnn:  Vec<TdnnBlock<B>>,
    pub dense: Vec<DenseBlock<B>>,
}

impl<B: Backend> Xvector<B> {
    /// feats [B, T, F] + lens [B] → [B, lin_neurons]
    pub fn forward(&self, feats: Tensor<B, 3>, lens: &Tensor<B, 1>) -> Tensor<B, 2> {
        let mut x = pooled_tdnn(&self.tdnn, feats, lens);
        for block in &self.dense {
            x = block.forward(x);
        }
        x
    }

    /// Flattened layer sequence in forward order.
    pub fn layer_plan(&self) -> Vec<LayerInfo> {
        layer_plan(self.tdnn.len(), self.dense.len())
    }

    pub fn layer_index(&self, tag: LayerTag) -> Option<usize> {
        self.layer_plan().iter().position(|l| l.tag == Some(tag))
    }

    /// Keep every layer up to and including the tagged one.
    pub fn truncate(&self, tag: LayerTag) -> Result<XvectorEmbedder<B>> {
        let LayerTag::Embedding(n) = tag;
        if n >= self.dense.len() {
            bail!(
                "Cannot truncate at {:?}: the trunk has {} dense block(s)",
                tag,
                self.dense.len()
            );
        }
        Ok(XvectorEmbedder {
            tdnn:      self.tdnn.clone(),
            dense:     self.dense[..n].to_vec(),
            embedding: self.dense[n].linear.clone(),
        })
    }
}

fn pooled_tdnn<B: Backend>(tdnn: &[TdnnBlock<B>], feats: Tensor<B, 3>, lens: &Tensor<B, 1>) -> Tensor<B, 2> {
    let mut x = feats.swap_dims(1, 2);
    for block in tdnn {
        x = block.forward(x);
    }
    statistics_pooling(x, lens)
}

/// Trunk cut after an embedding Linear.
#[derive(Module, Debug)]
pub struct XvectorEmbedder<B: Backend> {
    pub tdnn:      Vec<TdnnBlock<B>>,
    pub dense:     Vec<DenseBlock<B>>,
    pub embedding: Linear<B>,
}

impl<B: Backend> XvectorEmbedder<B> {
    pub fn forward(&self, feats: Tensor<B, 3>, lens: &Tensor<B, 1>) -> Tensor<B, 2> {
        let mut x = pooled_tdnn(&self.tdnn, feats, lens);
        for block in &self.dense {
            x = block.forward(x);
        }
        self.embedding.forward(x)
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding.weight.val().dims()[1]
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct XvectorClassifier<B: Backend> {
    pub trunk:      Xvector<B>,
    pub out_linear: Linear<B>,
}

impl<B: Backend> XvectorClassifier<B> {
    /// Log class probabilities — shape: [B, n_speakers]
    pub fn forward(&self, feats: Tensor<B, 3>, lens: &Tensor<B, 1>) -> Tensor<B, 2> {
        log_softmax(self.out_linear.forward(self.trunk.forward(feats, lens)), 1)
    }
}
