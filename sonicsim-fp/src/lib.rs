//! sonicsim-fp: landmark audio fingerprinting and sonic similarity search
//!
//! Audio is decoded to mono, transformed to a dB spectrogram, reduced to
//! spectral peaks and paired into 32-bit landmark hashes. Fingerprints live in
//! SQLite; searches score candidates by how many shared hashes line up at a
//! consistent time offset.
//!
//! ```rust,ignore
//! use sonicsim_fp::{FingerprintConfig, SearchOptions, SimilarityIndex};
//!
//! let config = FingerprintConfig::load(None)?;
//! let index = SimilarityIndex::open(&config).await?;
//! let report = index.find_similar(Path::new("kick_01.wav"), SearchOptions::default()).await?;
//! for m in report.matches {
//!     println!("{} {:.1}", m.path, m.score);
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod types;
pub mod utils;

pub use crate::config::FingerprintConfig;
pub use crate::db::FingerprintStore;
pub use crate::error::{DecodeError, ServiceError, SpectrogramError};
pub use crate::models::{
    AnalysisStatus, Fingerprint, FingerprintEntry, FingerprintOutcome, HashValue, Landmark,
    MatchResult,
};
pub use crate::services::{
    BackfillSummary, FingerprintService, Fingerprinter, PendingBatch, PendingFingerprint,
    SearchOptions, SimilarityIndex, SimilarityReport,
};
pub use crate::types::{Waveform, WaveformLoader};
