// ============================================================
// Layer 6 — Experiment Directory
// ============================================================
// <output_folder>/
//   params.yaml         ← fully resolved hyperparameters
//   params_source.yaml  ← the params file as given (if any)
//   overrides.yaml      ← command-line overrides, one per line

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::config::Hyperparams;

pub fn create_experiment_directory(
    hparams:     &Hyperparams,
    params_file: Option<&Path>,
    overrides:   &[String],
) -> Result<PathBuf> {
    let dir = PathBuf::from(&hparams.output_folder);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create experiment folder '{}'", dir.display()))?;

    fs::write(dir.join("params.yaml"), hparams.to_yaml()?)
        .with_context(|| format!("Cannot write params into '{}'", dir.display()))?;

    if let Some(src) = params_file {
        fs::copy(src, dir.join("params_source.yaml"))
            .with_context(|| format!("Cannot copy '{}'", src.display()))?;
    }

    let ov: Vec<String> = overrides.iter().map(|o| format!("{o}\n")).collect();
    fs::write(dir.join("overrides.yaml"), ov.concat())?;

    tracing::info!("Experiment directory: '{}'", dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_resolved_params_and_source() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exp");
        let src = dir.path().join("train.yaml");
        let yaml = format!("output_folder: {}\ndata_folder: /data\n", out.display());
        fs::write(&src, &yaml).unwrap();

        let ov = vec!["--lr=0.01".to_string()];
        let hp = Hyperparams::load(&src, &ov).unwrap();
        let exp = create_experiment_directory(&hp, Some(&src), &ov).unwrap();

        assert_eq!(exp, out);
        assert_eq!(fs::read_to_string(out.join("params_source.yaml")).unwrap(), yaml);
        assert_eq!(fs::read_to_string(out.join("overrides.yaml")).unwrap(), "--lr=0.01\n");

        let saved = Hyperparams::load(out.join("params.yaml"), &[]).unwrap();
        assert_eq!(saved.lr, 0.01);
        assert_eq!(saved.save_folder, format!("{}/save", out.display()));
    }
}
