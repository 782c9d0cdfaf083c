// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw corpus directory to tensor batches:
//
//   corpus directory
//       │
//       ▼
//   VoxCelebCorpus    → lists <speaker>/<session>/<utt>.wav
//       │
//       ▼
//   prepare_voxceleb1 → split, trim, chunk, write manifests
//       │
//       ▼
//   SegmentDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   SpeakerBatcher    → pads waveforms into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// `fbank` holds the pure-Rust filterbank used by the feature
// pipeline in the ML layer.

/// Wav probing and segment reading with hound
pub mod audio;

/// Energy-based trimming of leading/trailing silence
pub mod vad;

/// Walks a VoxCeleb1 directory tree
pub mod corpus;

/// Fixed-duration segment chunking
pub mod chunker;

/// Seeded shuffle-and-split by percentages
pub mod splitter;

/// JSON manifest reading and writing
pub mod manifest;

/// Corpus preparation: utterances → train/dev manifests
pub mod prepare;

/// Speaker label ↔ class index mapping
pub mod labels;

/// Implements Burn's Dataset trait over a manifest
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Log mel filterbank features
pub mod fbank;
