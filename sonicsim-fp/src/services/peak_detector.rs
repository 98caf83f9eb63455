//! Spectrogram peak picking
//!
//! A cell is a landmark when it equals the maximum of its square
//! neighbourhood and is strictly louder than the amplitude threshold. The
//! neighbourhood for size `s` spans offsets `-(s/2) ..= s-1-s/2` on both axes
//! and is clipped at the grid edges.

use super::spectrogram::Spectrogram;
use crate::config::PeakConfig;
use crate::models::Landmark;
use std::collections::VecDeque;

/// Local-maximum detector over a dB grid
#[derive(Debug, Clone)]
pub struct PeakDetector {
    config: PeakConfig,
}

impl PeakDetector {
    /// A zero neighbourhood is treated as 1 (every loud cell is a peak)
    pub fn new(mut config: PeakConfig) -> Self {
        config.neighborhood_size = config.neighborhood_size.max(1);
        Self { config }
    }

    /// Landmarks in frequency-major order (all frames of bin 0, then bin 1, ...)
    pub fn find_peaks(&self, spectrogram: &Spectrogram) -> Vec<Landmark> {
        let bins = spectrogram.bins();
        let frames = spectrogram.frames();
        if bins == 0 || frames == 0 || spectrogram.is_silent() {
            return Vec::new();
        }

        let size = self.config.neighborhood_size;
        let before = size / 2;
        let after = size - 1 - size / 2;

        // Separable max filter: along time per bin, then along frequency per frame
        let mut time_max = vec![0.0f32; bins * frames];
        for bin in 0..bins {
            sliding_max(
                spectrogram.row(bin),
                before,
                after,
                &mut time_max[bin * frames..(bin + 1) * frames],
            );
        }

        let mut filtered = vec![0.0f32; bins * frames];
        let mut column = vec![0.0f32; bins];
        let mut column_max = vec![0.0f32; bins];
        for frame in 0..frames {
            for bin in 0..bins {
                column[bin] = time_max[bin * frames + frame];
            }
            sliding_max(&column, before, after, &mut column_max);
            for bin in 0..bins {
                filtered[bin * frames + frame] = column_max[bin];
            }
        }

        let threshold = self.config.amplitude_threshold_db;
        let values = spectrogram.values();
        let mut peaks = Vec::new();
        for bin in 0..bins {
            for frame in 0..frames {
                let idx = bin * frames + frame;
                let value = values[idx];
                if value == filtered[idx] && value > threshold {
                    peaks.push(Landmark::new(bin as u32, frame as u32));
                }
            }
        }

        tracing::debug!(peaks = peaks.len(), bins, frames, "Peak detection complete");
        peaks
    }
}

/// `out[i] = max(input[i - before ..= i + after])`, clipped to the slice
fn sliding_max(input: &[f32], before: usize, after: usize, out: &mut [f32]) {
    let n = input.len();
    let mut window: VecDeque<usize> = VecDeque::with_capacity(before + after + 1);
    let mut next = 0;

    for i in 0..n {
        let right = (i + after).min(n - 1);
        while next <= right {
            while let Some(&back) = window.back() {
                if input[back] <= input[next] {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(next);
            next += 1;
        }

        let left = i.saturating_sub(before);
        while let Some(&front) = window.front() {
            if front < left {
                window.pop_front();
            } else {
                break;
            }
        }

        if let Some(&front) = window.front() {
            out[i] = input[front];
        }
    }
}
