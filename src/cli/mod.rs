// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, loads the hyperparameters and
// hands off to Layer 2. Only routing and printing happen here.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ExtractArgs, TrainArgs};

use crate::application::{
    extract_use_case::ExtractUseCase,
    train_use_case::{check_overfit, TrainUseCase},
};
use crate::config::Hyperparams;

#[derive(Parser, Debug)]
#[command(
    name = "xvector",
    version,
    about = "Train an x-vector speaker-embedding model on VoxCeleb1 and extract embeddings."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Extract(args) => run_extract(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    args.validate()?;
    let p  = args.params;
    let hp = Hyperparams::load(&p.params, &p.overrides)?;
    tracing::info!("Training with params '{}', output in '{}'", p.params.display(), hp.output_folder);

    let outcome = TrainUseCase::new(hp).with_source(&p.params, p.overrides).execute()?;
    println!(
        "Final average train loss: {:.4} (embedding layer {})",
        outcome.report.avg_train_loss, outcome.embedding_layer
    );

    if let Some(threshold) = args.max_train_loss {
        check_overfit(outcome.report.avg_train_loss, threshold)?;
        println!("Average train loss is below {threshold}");
    }
    Ok(())
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let p  = args.params;
    let hp = Hyperparams::load(&p.params, &p.overrides)?;

    let outcome = ExtractUseCase::new(hp).execute()?;
    println!("Extracted Xvector.Shape: {:?}", outcome.shape);
    for (id, emb) in outcome.ids.iter().zip(&outcome.embeddings) {
        let norm = emb.iter().map(|v| v * v).sum::<f32>().sqrt();
        println!("{id}\t|x| = {norm:.4}");
    }
    Ok(())
}
