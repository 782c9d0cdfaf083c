// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn-specific code of the recipe:
//
//   features.rs      — batch filterbank + masked mean/variance
//                      normalisation (shared by training and
//                      extraction)
//
//   model.rs         — the x-vector TDNN trunk, the classifier
//                      stack, and tag-based truncation into an
//                      embedding-only model
//
//   objectives.rs    — NLL cost and classification error
//
//   brain.rs         — the generic epoch loop and the `Brain`
//                      hook trait it calls back into
//
//   xvector_brain.rs — the speaker-classification hook set
//
//   extractor.rs     — maps a batch to embeddings with a
//                      truncated trunk
//
// Training runs on `TrainBackend` (autodiff); validation and
// extraction run on `InferBackend`, which records no gradients.

/// Feature pipeline: fbank → normalisation
pub mod features;

/// x-vector architecture and truncation
pub mod model;

/// Loss and error metrics
pub mod objectives;

/// Generic training orchestrator
pub mod brain;

/// Hooks for speaker classification training
pub mod xvector_brain;

/// Embedding extractor over a truncated trunk
pub mod extractor;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray<f32>;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub type InferDevice = <InferBackend as burn::tensor::backend::Backend>::Device;
