//! Error types for sonicsim-fp

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a file into mono samples
#[derive(Debug, Error)]
pub enum DecodeError {
    /// File could not be opened
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Container or codec not understood
    #[error("Unsupported format for {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    /// Decoder failed partway through the stream
    #[error("Decode failed for {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Sample-rate conversion failed
    #[error("Resampling failed for {path}: {reason}")]
    Resample { path: PathBuf, reason: String },
}

/// Spectrogram input rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpectrogramError {
    /// No samples to analyse
    #[error("Audio contains no samples")]
    EmptyAudio,

    /// Caller passed audio at a rate other than the analysis rate
    #[error("Sample rate {actual} Hz does not match analysis rate {expected} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },
}

/// Fingerprint service submission errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// `shutdown()` was called; no new jobs accepted
    #[error("Fingerprint service is shut down")]
    ShutDown,

    /// Bounded queue has no free slot
    #[error("Fingerprint queue is full ({capacity} jobs)")]
    QueueFull { capacity: usize },

    /// Constructed outside a Tokio runtime
    #[error("Fingerprint service requires a Tokio runtime")]
    NoRuntime,

    /// Worker dropped the reply without answering
    #[error("Fingerprint worker exited without a result")]
    WorkerLost,
}
