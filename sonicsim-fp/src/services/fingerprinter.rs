//! Landmark fingerprint generation
//!
//! Synchronous pipeline: load → spectrogram → peaks → landmark hashes. All
//! failures are folded into the returned [`FingerprintOutcome`]; nothing here
//! panics or returns `Err` for bad audio.

use super::landmark_hasher::LandmarkHasher;
use super::peak_detector::PeakDetector;
use super::spectrogram::SpectrogramComputer;
use super::waveform_loader::SymphoniaWaveformLoader;
use crate::config::FingerprintConfig;
use crate::error::SpectrogramError;
use crate::models::FingerprintOutcome;
use crate::types::{Waveform, WaveformLoader};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Audio fingerprinter
pub struct Fingerprinter {
    loader: Arc<dyn WaveformLoader>,
    spectrogram: SpectrogramComputer,
    peaks: PeakDetector,
    hasher: LandmarkHasher,
}

impl Fingerprinter {
    /// Create a fingerprinter that decodes files with symphonia
    pub fn new(config: &FingerprintConfig) -> Self {
        let loader = Arc::new(SymphoniaWaveformLoader::new(&config.analysis));
        Self::with_loader(config, loader)
    }

    /// Create a fingerprinter over a custom waveform source
    pub fn with_loader(config: &FingerprintConfig, loader: Arc<dyn WaveformLoader>) -> Self {
        Self {
            loader,
            spectrogram: SpectrogramComputer::new(config.analysis.clone()),
            peaks: PeakDetector::new(config.peaks.clone()),
            hasher: LandmarkHasher::new(config.hashing.clone()),
        }
    }

    /// Fingerprint the audio file at `path`
    pub fn generate_fingerprint(&self, path: &Path) -> FingerprintOutcome {
        self.generate_cancellable(path, &CancellationToken::new())
    }

    /// Fingerprint `path`, giving up between stages once `cancel` fires
    pub fn generate_cancellable(&self, path: &Path, cancel: &CancellationToken) -> FingerprintOutcome {
        let started = Instant::now();

        if cancel.is_cancelled() {
            return FingerprintOutcome::cancelled();
        }

        let waveform = match self.loader.load(path) {
            Ok(waveform) => waveform,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Audio decode failed");
                return FingerprintOutcome::decode_failed(e.to_string());
            }
        };

        let outcome = self.analyze(&waveform, cancel);

        tracing::debug!(
            path = %path.display(),
            status = ?outcome.status,
            hash_count = outcome.fingerprint.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fingerprint generated"
        );

        outcome
    }

    /// Fingerprint samples already in memory
    pub fn fingerprint_waveform(&self, waveform: &Waveform) -> FingerprintOutcome {
        self.analyze(waveform, &CancellationToken::new())
    }

    fn analyze(&self, waveform: &Waveform, cancel: &CancellationToken) -> FingerprintOutcome {
        if cancel.is_cancelled() {
            return FingerprintOutcome::cancelled();
        }

        let spectrogram = match self.spectrogram.compute(&waveform.samples, waveform.sample_rate) {
            Ok(spectrogram) => spectrogram,
            Err(SpectrogramError::EmptyAudio) => return FingerprintOutcome::empty_audio(),
            Err(e @ SpectrogramError::SampleRateMismatch { .. }) => {
                return FingerprintOutcome::decode_failed(e.to_string());
            }
        };

        if cancel.is_cancelled() {
            return FingerprintOutcome::cancelled();
        }

        let landmarks = self.peaks.find_peaks(&spectrogram);

        if cancel.is_cancelled() {
            return FingerprintOutcome::cancelled();
        }

        FingerprintOutcome::analyzed(self.hasher.hash_landmarks(&landmarks))
    }
}
