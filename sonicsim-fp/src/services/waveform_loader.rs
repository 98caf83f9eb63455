//! File-backed waveform loader (symphonia decode + rubato resample)

use crate::config::AnalysisConfig;
use crate::error::DecodeError;
use crate::types::{Waveform, WaveformLoader};
use crate::utils::{decode_audio_file, resample_mono};
use std::path::Path;
use symphonia::core::errors::Error as SymphoniaError;

/// Production [`WaveformLoader`]
///
/// Decodes at most `max_duration_secs` of audio, mixes to mono and converts
/// to the analysis sample rate.
#[derive(Debug, Clone)]
pub struct SymphoniaWaveformLoader {
    target_rate: u32,
    max_duration_secs: f64,
}

impl SymphoniaWaveformLoader {
    pub fn new(analysis: &AnalysisConfig) -> Self {
        Self {
            target_rate: analysis.sample_rate,
            max_duration_secs: analysis.max_duration_secs,
        }
    }
}

impl Default for SymphoniaWaveformLoader {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl WaveformLoader for SymphoniaWaveformLoader {
    fn load(&self, path: &Path) -> Result<Waveform, DecodeError> {
        let decoded = decode_audio_file(path, Some(self.max_duration_secs))
            .map_err(|e| classify_decode_error(path, e))?;

        if decoded.samples.is_empty() {
            return Ok(Waveform::new(Vec::new(), self.target_rate));
        }

        let samples = resample_mono(&decoded.samples, decoded.sample_rate, self.target_rate)
            .map_err(|e| DecodeError::Resample {
                path: path.to_path_buf(),
                reason: format!("{:#}", e),
            })?;

        Ok(Waveform::new(samples, self.target_rate))
    }
}

/// Map the decoder's context chain onto the loader error kinds
fn classify_decode_error(path: &Path, err: anyhow::Error) -> DecodeError {
    if let Some(SymphoniaError::Unsupported(what)) = err.downcast_ref::<SymphoniaError>() {
        return DecodeError::Unsupported {
            path: path.to_path_buf(),
            reason: (*what).to_string(),
        };
    }

    if err.downcast_ref::<SymphoniaError>().is_none() {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return DecodeError::Open {
                path: path.to_path_buf(),
                source: std::io::Error::new(io.kind(), io.to_string()),
            };
        }
    }

    DecodeError::Decode {
        path: path.to_path_buf(),
        reason: format!("{:#}", err),
    }
}
