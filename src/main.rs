use anyhow::Result;
use clap::Parser;
use voxceleb_xvector::cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("voxceleb_xvector=info".parse()?),
        )
        .init();

    Cli::parse().run()
}
