// ============================================================
// Layer 4 — Wav Reading
// ============================================================
// Thin wrappers over `hound`:
//   probe_wav    → sample rate / channels / length, no sample data
//   read_segment → mono f32 samples of a [start, stop) window
//
// Integer PCM is scaled to [-1, 1]. Multi-channel audio is
// down-mixed by averaging the channels of each frame.

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use std::{fs::File, io::BufReader, path::Path};

/// Header information of a wav file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels:    u16,
    /// Frames per channel
    pub num_samples: usize,
}

pub fn probe_wav(path: impl AsRef<Path>) -> Result<WavInfo> {
    let path   = path.as_ref();
    let reader = open(path)?;
    let spec   = reader.spec();
    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels:    spec.channels,
        num_samples: reader.duration() as usize,
    })
}

/// Read the whole file as mono samples.
pub fn read_wav(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let info = probe_wav(path)?;
    let samples = read_segment(path, 0, info.num_samples)?;
    Ok((samples, info.sample_rate))
}

/// Read frames `[start, stop)` as mono samples.
pub fn read_segment(path: impl AsRef<Path>, start: usize, stop: usize) -> Result<Vec<f32>> {
    let path = path.as_ref();
    if stop < start {
        bail!("Invalid segment [{start}, {stop}) in '{}'", path.display());
    }

    let mut reader = open(path)?;
    let spec       = reader.spec();
    let total      = reader.duration() as usize;
    if stop > total {
        bail!(
            "Segment [{start}, {stop}) is past the end of '{}' ({total} samples)",
            path.display()
        );
    }

    let start_frame = u32::try_from(start).context("Segment start out of range")?;
    reader
        .seek(start_frame)
        .with_context(|| format!("Cannot seek to sample {start} in '{}'", path.display()))?;

    let channels = spec.channels.max(1) as usize;
    let wanted   = (stop - start) * channels;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .take(wanted)
            .collect::<std::result::Result<_, _>>()
            .with_context(|| format!("Cannot decode '{}'", path.display()))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .take(wanted)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .with_context(|| format!("Cannot decode '{}'", path.display()))?
        }
    };

    if channels == 1 {
        return Ok(interleaved);
    }
    Ok(interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect())
}

fn open(path: &Path) -> Result<WavReader<BufReader<File>>> {
    WavReader::open(path).with_context(|| format!("Cannot open wav file '{}'", path.display()))
}
