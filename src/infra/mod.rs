// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by the use cases:
//
//   checkpoint.rs — model weights via Burn's full-precision recorder,
//                   plus the XvectorConfig needed to rebuild
//                   the architecture before loading them
//
//   metrics.rs    — one CSV row per epoch
//
//   experiment.rs — the experiment directory: resolved params,
//                   a copy of the source params file and the
//                   command-line overrides

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Experiment directory setup
pub mod experiment;
