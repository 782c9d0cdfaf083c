// ============================================================
// Layer 4 — Energy-Based Voice Activity Trimming
// ============================================================
// Drops leading and trailing silence from an utterance before it
// is chunked into segments:
//
//   1. Cut the signal into 20 ms frames
//   2. Frame energy in dB relative to the loudest frame
//   3. Keep the span from the first to the last frame above
//      the threshold (default -40 dB)
//
// Silence inside the utterance is kept; only the edges move.

#[derive(Debug, Clone)]
pub struct VadConfig {
    pub frame_ms:     usize,
    /// Frames quieter than `max_db + threshold_db` count as silence
    pub threshold_db: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self { frame_ms: 20, threshold_db: -40.0 }
    }
}

/// Returns the `[start, stop)` sample range holding speech, or `None`
/// if every frame is silent.
pub fn trim_silence(samples: &[f32], sample_rate: u32, cfg: &VadConfig) -> Option<(usize, usize)> {
    let frame = (sample_rate as usize * cfg.frame_ms / 1000).max(1);
    if samples.is_empty() {
        return None;
    }

    let energies_db: Vec<f32> = samples
        .chunks(frame)
        .map(|c| {
            let power = c.iter().map(|s| s * s).sum::<f32>() / c.len() as f32;
            10.0 * power.max(1e-12).log10()
        })
        .collect();

    let max_db = energies_db.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    // An all-zero signal sits at the floor everywhere
    if max_db <= -119.0 {
        return None;
    }
    let floor = max_db + cfg.threshold_db;

    let first = energies_db.iter().position(|&e| e > floor)?;
    let last  = energies_db.iter().rposition(|&e| e > floor)?;

    let start = first * frame;
    let stop  = ((last + 1) * frame).min(samples.len());
    Some((start, stop))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_leading_and_trailing_silence() {
        // 0.1 s silence, 0.2 s tone, 0.1 s silence @ 16 kHz
        let mut x = vec![0.0f32; 1600];
        x.extend((0..3200).map(|i| (i as f32 * 0.1).sin() * 0.5));
        x.extend(vec![0.0f32; 1600]);

        let (start, stop) = trim_silence(&x, 16_000, &VadConfig::default()).unwrap();
        assert_eq!(start, 1600);
        assert_eq!(stop, 4800);
    }

    #[test]
    fn test_all_silence_gives_none() {
        assert!(trim_silence(&[0.0; 3200], 16_000, &VadConfig::default()).is_none());
        assert!(trim_silence(&[], 16_000, &VadConfig::default()).is_none());
    }

    #[test]
    fn test_speech_everywhere_keeps_everything() {
        let x: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.3).sin()).collect();
        assert_eq!(trim_silence(&x, 16_000, &VadConfig::default()), Some((0, 1000)));
    }
}
