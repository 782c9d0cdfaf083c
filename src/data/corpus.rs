// ============================================================
// Layer 4 — VoxCeleb Corpus Walker
// ============================================================
// Lists the utterances of a VoxCeleb1-style directory tree:
//
//   data_folder/
//     [wav/]                 ← optional, as shipped by VoxCeleb1
//       id10001/             ← speaker
//         1zcIwhmdeo4/       ← session (YouTube video id)
//           00001.wav        ← utterance
//
// Every level is visited in sorted order so the utterance list
// (and therefore the seeded split) is reproducible.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::segment::Utterance;
use crate::domain::traits::CorpusSource;

/// Walks a VoxCeleb1 directory.
/// Implements the CorpusSource trait from Layer 3.
pub struct VoxCelebCorpus {
    root: PathBuf,
}

impl VoxCelebCorpus {
    pub fn new(data_folder: impl AsRef<Path>) -> Self {
        let data_folder = data_folder.as_ref();
        // Accept both the corpus root and its `wav/` subdirectory
        let nested = data_folder.join("wav");
        let root   = if nested.is_dir() { nested } else { data_folder.to_path_buf() };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CorpusSource for VoxCelebCorpus {
    fn load_all(&self) -> Result<Vec<Utterance>> {
        if !self.root.is_dir() {
            bail!("Corpus directory '{}' does not exist", self.root.display());
        }

        let mut utts = Vec::new();
        for spk_dir in sorted_entries(&self.root)?.into_iter().filter(|p| p.is_dir()) {
            let spk = file_name(&spk_dir);

            for session_dir in sorted_entries(&spk_dir)?.into_iter().filter(|p| p.is_dir()) {
                let session = file_name(&session_dir);

                for wav in sorted_entries(&session_dir)?
                    .into_iter()
                    .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("wav"))
                {
                    let stem = wav
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("unknown")
                        .to_string();
                    let id = format!("{spk}--{session}--{stem}");
                    utts.push(Utterance::new(id, wav.to_string_lossy(), spk.clone()));
                }
            }
        }

        tracing::info!(
            "Found {} utterances under '{}'",
            utts.len(),
            self.root.display()
        );
        Ok(utts)
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Cannot list directory '{}'", dir.display()))?;
    entries.sort();
    Ok(entries)
}

fn file_name(p: &Path) -> String {
    p.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}
