// ============================================================
// Layer 4 — Log Mel Filterbank Features
// ============================================================
// Converts a mono waveform into frame-level log mel energies:
//
//   waveform ─► centred frames ─► Hamming window ─► |FFT|²
//            ─► triangular mel filters ─► ln(max(e, floor))
//
// Frames are centred on multiples of the hop, with zeros read
// outside the signal, so a signal of L samples always gives
// 1 + L / hop frames. Padded batches therefore map relative
// lengths onto frames without any bookkeeping.
//
// Output layout is row-major [frames][n_mels], flattened.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::{f64::consts::PI, fmt, sync::Arc};

use crate::config::FbankParams;

const ENERGY_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct FbankConfig {
    pub sample_rate: u32,
    pub n_mels:      usize,
    /// Window length in samples
    pub win_length:  usize,
    /// Hop length in samples
    pub hop_length:  usize,
    pub f_min:       f64,
    pub f_max:       f64,
}

impl FbankConfig {
    pub fn from_params(p: &FbankParams) -> Self {
        let ms_to_samples = |ms: f64| ((p.sample_rate as f64 * ms / 1000.0).round() as usize).max(1);
        Self {
            sample_rate: p.sample_rate,
            n_mels:      p.n_mels,
            win_length:  ms_to_samples(p.win_length_ms),
            hop_length:  ms_to_samples(p.hop_length_ms),
            f_min:       p.f_min,
            f_max:       p.f_max.unwrap_or(p.sample_rate as f64 / 2.0),
        }
    }

    /// FFT size: next power of two >= window length
    pub fn n_fft(&self) -> usize {
        self.win_length.next_power_of_two()
    }

    pub fn num_frames(&self, num_samples: usize) -> usize {
        1 + num_samples / self.hop_length
    }
}

impl Default for FbankConfig {
    fn default() -> Self {
        Self::from_params(&FbankParams::default())
    }
}

/// Precomputed window, filterbank and FFT plan.
#[derive(Clone)]
pub struct Fbank {
    cfg:        FbankConfig,
    window:     Vec<f32>,
    filterbank: Vec<Vec<f32>>,
    fft:        Arc<dyn Fft<f32>>,
}

impl fmt::Debug for Fbank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fbank").field("cfg", &self.cfg).finish()
    }
}

impl Fbank {
    pub fn new(cfg: FbankConfig) -> Self {
        let n_fft      = cfg.n_fft();
        let window     = hamming_window(cfg.win_length);
        let filterbank = mel_filterbank(cfg.n_mels, n_fft, cfg.sample_rate, cfg.f_min, cfg.f_max);
        let fft        = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
        Self { cfg, window, filterbank, fft }
    }

    pub fn config(&self) -> &FbankConfig {
        &self.cfg
    }

    pub fn n_mels(&self) -> usize {
        self.cfg.n_mels
    }

    /// Log mel energies, flattened `[num_frames * n_mels]`.
    pub fn compute(&self, samples: &[f32]) -> Vec<f32> {
        let n_fft      = self.cfg.n_fft();
        let half_fft   = n_fft / 2 + 1;
        let win        = self.cfg.win_length;
        let hop        = self.cfg.hop_length;
        let num_frames = self.cfg.num_frames(samples.len());
        let offset     = (win / 2) as isize;

        let mut out    = Vec::with_capacity(num_frames * self.cfg.n_mels);
        let mut buffer = vec![Complex::<f32>::new(0.0, 0.0); n_fft];
        let mut power  = vec![0.0f32; half_fft];

        for t in 0..num_frames {
            let begin = (t * hop) as isize - offset;

            for v in buffer.iter_mut() {
                *v = Complex::new(0.0, 0.0);
            }
            for i in 0..win {
                let idx = begin + i as isize;
                if idx >= 0 && (idx as usize) < samples.len() {
                    buffer[i] = Complex::new(samples[idx as usize] * self.window[i], 0.0);
                }
            }

            self.fft.process(&mut buffer);
            for (k, p) in power.iter_mut().enumerate() {
                *p = buffer[k].norm_sqr();
            }

            for filter in &self.filterbank {
                let energy: f64 = filter
                    .iter()
                    .zip(power.iter())
                    .map(|(&w, &p)| (w * p) as f64)
                    .sum();
                out.push(energy.max(ENERGY_FLOOR).ln() as f32);
            }
        }
        out
    }
}

fn hamming_window(n: usize) -> Vec<f32> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| (0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos()) as f32)
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters on a continuous frequency axis, `[n_mels][half_fft]`.
fn mel_filterbank(n_mels: usize, n_fft: usize, sample_rate: u32, f_min: f64, f_max: f64) -> Vec<Vec<f32>> {
    let half_fft = n_fft / 2 + 1;
    let mel_low  = hz_to_mel(f_min);
    let mel_high = hz_to_mel(f_max);

    let hz_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_low + i as f64 * (mel_high - mel_low) / (n_mels + 1) as f64))
        .collect();
    let bin_hz = sample_rate as f64 / n_fft as f64;

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
            (0..half_fft)
                .map(|k| {
                    let f = k as f64 * bin_hz;
                    let w = if f >= left && f <= center && center > left {
                        (f - left) / (center - left)
                    } else if f > center && f <= right && right > center {
                        (right - f) / (right - center)
                    } else {
                        0.0
                    };
                    w as f32
                })
                .collect()
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 16_000.0).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_default_config_is_25ms_10ms() {
        let cfg = FbankConfig::default();
        assert_eq!(cfg.win_length, 400);
        assert_eq!(cfg.hop_length, 160);
        assert_eq!(cfg.n_fft(), 512);
        assert_eq!(cfg.f_max, 8000.0);
    }

    #[test]
    fn test_frame_count_is_one_plus_len_over_hop() {
        let fbank = Fbank::new(FbankConfig::default());
        let feats = fbank.compute(&tone(440.0, 16_000));
        assert_eq!(feats.len(), 101 * 24);

        let feats = fbank.compute(&[]);
        assert_eq!(feats.len(), 24);
    }

    #[test]
    fn test_silence_sits_at_the_floor() {
        let fbank = Fbank::new(FbankConfig::default());
        let feats = fbank.compute(&[0.0; 1600]);
        let floor = (ENERGY_FLOOR.ln()) as f32;
        assert!(feats.iter().all(|&v| (v - floor).abs() < 1e-3));
    }

    #[test]
    fn test_tone_energy_lands_in_matching_band() {
        let fbank = Fbank::new(FbankConfig::default());
        let low   = fbank.compute(&tone(300.0, 4000));
        let high  = fbank.compute(&tone(3000.0, 4000));

        // Middle frame, argmax band
        let frame  = 12 * 24;
        let argmax = |v: &[f32]| {
            v.iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .map(|(i, _)| i)
                .unwrap()
        };
        assert!(argmax(&low[frame..frame + 24]) < argmax(&high[frame..frame + 24]));
    }

    #[test]
    fn test_filters_are_non_negative_and_non_empty() {
        let fb = mel_filterbank(24, 512, 16_000, 0.0, 8000.0);
        assert_eq!(fb.len(), 24);
        for filt in &fb {
            assert_eq!(filt.len(), 257);
            assert!(filt.iter().all(|&w| (0.0..=1.0).contains(&w)));
            assert!(filt.iter().any(|&w| w > 0.0));
        }
    }
}
