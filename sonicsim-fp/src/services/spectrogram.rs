//! Short-time Fourier transform magnitude grid
//!
//! Frames are centred: the input is zero-padded by `n_fft / 2` on both sides,
//! so frame `t` covers samples around `t * hop_length` and a signal of `len`
//! samples yields `1 + len / hop_length` frames. Each frame is weighted with a
//! periodic Hann window. Magnitudes are converted to dB relative to the
//! loudest cell in the grid and floored at `-TOP_DB`.

use crate::config::AnalysisConfig;
use crate::error::SpectrogramError;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Magnitudes at or below this are treated as silence
pub const AMIN: f32 = 1e-5;

/// Dynamic range kept below the grid maximum
pub const TOP_DB: f32 = 80.0;

/// Magnitude grid in dB, stored frequency-major (`[bin][frame]`)
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    bins: usize,
    frames: usize,
    data: Vec<f32>,
    silent: bool,
}

impl Spectrogram {
    /// Build from a frequency-major buffer of `bins * frames` values
    pub fn from_db(bins: usize, frames: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), bins * frames);
        Self {
            bins,
            frames,
            data,
            silent: false,
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// dB value at `(bin, frame)`
    pub fn get(&self, bin: usize, frame: usize) -> f32 {
        self.data[bin * self.frames + frame]
    }

    /// One frequency row across all frames
    pub fn row(&self, bin: usize) -> &[f32] {
        &self.data[bin * self.frames..(bin + 1) * self.frames]
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// True when the input never rose above [`AMIN`]
    pub fn is_silent(&self) -> bool {
        self.silent
    }
}

/// STFT front end of the fingerprint pipeline
pub struct SpectrogramComputer {
    config: AnalysisConfig,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectrogramComputer {
    pub fn new(config: AnalysisConfig) -> Self {
        let n_fft = config.n_fft;
        let window = (0..n_fft)
            .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / n_fft as f32).cos())
            .collect();
        let fft = FftPlanner::new().plan_fft_forward(n_fft);

        Self {
            config,
            window,
            fft,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Compute the dB grid for mono `samples` at `sample_rate`
    ///
    /// Input longer than the analysis window is truncated.
    pub fn compute(&self, samples: &[f32], sample_rate: u32) -> Result<Spectrogram, SpectrogramError> {
        if sample_rate != self.config.sample_rate {
            return Err(SpectrogramError::SampleRateMismatch {
                expected: self.config.sample_rate,
                actual: sample_rate,
            });
        }
        if samples.is_empty() {
            return Err(SpectrogramError::EmptyAudio);
        }

        let samples = &samples[..samples.len().min(self.config.max_samples())];
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let pad = n_fft / 2;
        let bins = self.config.bin_count();
        let frames = 1 + samples.len() / hop;

        let mut magnitudes = vec![0.0f32; bins * frames];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for frame in 0..frames {
            // Frame start in unpadded coordinates; may be negative
            let start = (frame * hop) as isize - pad as isize;
            for (n, slot) in buffer.iter_mut().enumerate() {
                let idx = start + n as isize;
                let sample = if idx >= 0 && (idx as usize) < samples.len() {
                    samples[idx as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[n], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (bin, value) in buffer.iter().take(bins).enumerate() {
                magnitudes[bin * frames + frame] = value.norm();
            }
        }

        let reference = magnitudes.iter().copied().fold(0.0f32, f32::max);
        if reference <= AMIN {
            tracing::debug!(frames, "Spectrogram is silent");
            return Ok(Spectrogram {
                bins,
                frames,
                data: vec![-TOP_DB; bins * frames],
                silent: true,
            });
        }

        let ref_db = 20.0 * reference.log10();
        for m in magnitudes.iter_mut() {
            let db = 20.0 * m.max(AMIN).log10() - ref_db;
            *m = db.max(-TOP_DB);
        }

        Ok(Spectrogram {
            bins,
            frames,
            data: magnitudes,
            silent: false,
        })
    }
}
