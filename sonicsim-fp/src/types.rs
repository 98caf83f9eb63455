//! Core types and trait definitions for sonicsim-fp
//!
//! The [`WaveformLoader`] trait is the boundary between file I/O and the
//! analysis pipeline. Everything downstream of it works on in-memory samples.

use crate::error::DecodeError;
use std::path::Path;

/// Mono PCM audio at a known sample rate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    /// Mono samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Source of analysis-ready audio
///
/// Implementations must return mono samples at the analysis sample rate,
/// truncated to the analysis window. A file that decodes to nothing is an
/// empty [`Waveform`], not an error.
///
/// # Example
/// ```rust,ignore
/// use sonicsim_fp::types::{Waveform, WaveformLoader};
///
/// struct Synthetic;
///
/// impl WaveformLoader for Synthetic {
///     fn load(&self, _path: &Path) -> Result<Waveform, DecodeError> {
///         Ok(Waveform::new(vec![0.0; 22050], 22050))
///     }
/// }
/// ```
pub trait WaveformLoader: Send + Sync {
    /// Decode `path` into analysis-ready mono samples
    fn load(&self, path: &Path) -> Result<Waveform, DecodeError>;
}
