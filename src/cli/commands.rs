// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands share the same shape:
//
//   xvector train   [--max-train-loss X] <params.yaml> [--key=value ...]
//   xvector extract <params.yaml> [--key=value ...]
//
// Everything after the params file is an override. The value is
// parsed as YAML against the params tree (see config::overrides).
// Command flags therefore go before the params file.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prepare VoxCeleb1, train the x-vector classifier and embed one valid batch
    Train(TrainArgs),

    /// Embed the valid split with the last saved checkpoint
    Extract(ExtractArgs),
}

/// Params file plus trailing `--key=value` overrides.
#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// YAML hyperparameter file
    pub params: PathBuf,

    /// Overrides such as --number_of_epochs=2 or --model.lin_neurons=256
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub overrides: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Fail unless the final epoch's average training loss is below this value.
    /// Must come before the params file.
    #[arg(long)]
    pub max_train_loss: Option<f64>,

    #[command(flatten)]
    pub params: ParamsArgs,
}

impl TrainArgs {
    /// Reject command flags that ended up among the overrides.
    pub fn validate(&self) -> Result<()> {
        let misplaced = self
            .params
            .overrides
            .iter()
            .any(|o| o == "--max-train-loss" || o.starts_with("--max-train-loss="));
        if misplaced {
            bail!(
                "--max-train-loss must come before the params file, e.g. \
                 `xvector train --max-train-loss 0.1 {}`",
                self.params.params.display()
            );
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub params: ParamsArgs,
}
