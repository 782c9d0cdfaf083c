// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's named MessagePack
// recorder at full precision, so a reloaded model is bit-identical
// to the one that was saved.
//
// Files in the save folder:
//   model_epoch_1.mpk.gz   ← weights after epoch 1
//   model_epoch_2.mpk.gz
//   ...
//   latest_epoch.json      ← number of the latest saved epoch
//   xvector_config.json    ← architecture used to rebuild the model
//
// Loading fails if the record does not match the architecture
// rebuilt from xvector_config.json.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::model::XvectorConfig;

const LATEST_FILE: &str = "latest_epoch.json";
const CONFIG_FILE: &str = "xvector_config.json";

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Stores checkpoints in a single directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint folder '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Save model weights for `epoch` and point latest_epoch.json at them.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        // Recorder adds the extension
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        <CheckpointRecorder as Recorder<B>>::record(&CheckpointRecorder::new(), model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join(LATEST_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest_path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest saved weights into `model`.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = <CheckpointRecorder as Recorder<B>>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &XvectorConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<XvectorConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'extract'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json).with_context(|| format!("Malformed model config '{}'", path.display()))
    }

    /// Number of the most recently saved epoch.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::XvectorClassifier;

    type TestBackend = burn::backend::NdArray<f32>;

    fn config() -> XvectorConfig {
        XvectorConfig::new(8, 2, vec![4], vec![3], vec![1], 6, 1)
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_config(&config()).unwrap();

        let back = ckpt.load_config().unwrap();
        assert_eq!(back.tdnn_channels, vec![4]);
        assert_eq!(back.lin_neurons, 6);
    }

    #[test]
    fn test_weights_round_trip_through_latest_epoch() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let trained: XvectorClassifier<TestBackend> = config().init(&device);
        ckpt.save_model::<TestBackend, _>(&trained, 1).unwrap();
        ckpt.save_model::<TestBackend, _>(&trained, 2).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), 2);

        let fresh: XvectorClassifier<TestBackend> = config().init(&device);
        let loaded = ckpt.load_model::<TestBackend, _>(fresh, &device).unwrap();

        let w = |m: &XvectorClassifier<TestBackend>| -> Vec<f32> {
            m.out_linear.weight.val().into_data().to_vec().unwrap()
        };
        assert_eq!(w(&loaded), w(&trained));
    }

    #[test]
    fn test_missing_checkpoint_is_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.latest_epoch().is_err());
        assert!(ckpt.load_config().is_err());
    }
}
