//! Data models for sonicsim-fp

pub mod fingerprint;
pub mod hash_value;
pub mod results;

pub use fingerprint::{Fingerprint, FingerprintEntry, Landmark};
pub use hash_value::{HashPackError, HashValue, MAX_FREQ_BIN, MAX_TIME_DELTA};
pub use results::{AnalysisStatus, FingerprintOutcome, MatchResult};
