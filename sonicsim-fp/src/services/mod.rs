//! Fingerprint pipeline stages and the services built on them
//!
//! Leaf-first: waveform loading, spectrogram, peak picking, landmark
//! hashing and matching; then the synchronous [`Fingerprinter`], the
//! background [`FingerprintService`] and the [`SimilarityIndex`].

pub mod fingerprint_service;
pub mod fingerprinter;
pub mod landmark_hasher;
pub mod matcher;
pub mod peak_detector;
pub mod similarity;
pub mod spectrogram;
pub mod waveform_loader;

pub use fingerprint_service::{BatchResults, FingerprintService, PendingBatch, PendingFingerprint};
pub use fingerprinter::Fingerprinter;
pub use landmark_hasher::LandmarkHasher;
pub use matcher::Matcher;
pub use peak_detector::PeakDetector;
pub use similarity::{BackfillSummary, SearchOptions, SimilarityIndex, SimilarityReport};
pub use spectrogram::{Spectrogram, SpectrogramComputer};
pub use waveform_loader::SymphoniaWaveformLoader;
