// ============================================================
// Configuration Layer — Hyperparameters
// ============================================================
// The recipe is driven by one YAML document plus any number of
// `--key=value` overrides from the command line:
//
//   params.yaml ──► serde_yaml::Value
//                     │  apply overrides   (overrides.rs)
//                     │  resolve <refs>    (overrides.rs)
//                     ▼
//                 Hyperparams            (hparams.rs)
//
// Once built, Hyperparams is read-only for the rest of the run.

/// Typed hyperparameter sections and validation
pub mod hparams;

/// Command-line overrides and `<key>` reference resolution
pub mod overrides;

pub use hparams::{FbankParams, Hyperparams, ModelParams, NormParams, NormType, PrepareParams};
