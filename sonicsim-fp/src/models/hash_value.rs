//! Packed landmark-pair hash
//!
//! Bit layout of the 32-bit value (most significant first):
//!
//! | bits   | width | field        | range       |
//! |--------|-------|--------------|-------------|
//! | 31..21 | 11    | anchor bin   | 0..=2047    |
//! | 20..10 | 11    | target bin   | 0..=2047    |
//! | 9..0   | 10    | time delta   | 1..=1023    |
//!
//! An FFT window of 2048 yields 1025 bins and the default pairing window is
//! 200 frames, so both fit with headroom. Configuration validation rejects
//! analysis settings that would not fit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width of each frequency-bin field
pub const FREQ_BITS: u32 = 11;

/// Width of the time-delta field
pub const DELTA_BITS: u32 = 10;

/// Largest frequency bin that can be packed
pub const MAX_FREQ_BIN: u32 = (1 << FREQ_BITS) - 1;

/// Largest anchor→target time delta (in STFT frames) that can be packed
pub const MAX_TIME_DELTA: u32 = (1 << DELTA_BITS) - 1;

const TARGET_SHIFT: u32 = DELTA_BITS;
const ANCHOR_SHIFT: u32 = DELTA_BITS + FREQ_BITS;
const FREQ_MASK: u32 = MAX_FREQ_BIN;
const DELTA_MASK: u32 = MAX_TIME_DELTA;

const _: () = assert!(ANCHOR_SHIFT + FREQ_BITS == u32::BITS);

/// Field out of range for the packed layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HashPackError {
    #[error("anchor bin {0} exceeds {max}", max = MAX_FREQ_BIN)]
    AnchorBinOutOfRange(u32),

    #[error("target bin {0} exceeds {max}", max = MAX_FREQ_BIN)]
    TargetBinOutOfRange(u32),

    #[error("time delta {0} outside 1..={max}", max = MAX_TIME_DELTA)]
    TimeDeltaOutOfRange(u32),
}

/// Hash of one anchor/target landmark pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(u32);

impl HashValue {
    /// Pack `(anchor_bin, target_bin, time_delta)` into one value
    pub fn pack(anchor_bin: u32, target_bin: u32, time_delta: u32) -> Result<Self, HashPackError> {
        if anchor_bin > MAX_FREQ_BIN {
            return Err(HashPackError::AnchorBinOutOfRange(anchor_bin));
        }
        if target_bin > MAX_FREQ_BIN {
            return Err(HashPackError::TargetBinOutOfRange(target_bin));
        }
        if time_delta == 0 || time_delta > MAX_TIME_DELTA {
            return Err(HashPackError::TimeDeltaOutOfRange(time_delta));
        }

        Ok(Self(
            (anchor_bin << ANCHOR_SHIFT) | (target_bin << TARGET_SHIFT) | time_delta,
        ))
    }

    /// Recover `(anchor_bin, target_bin, time_delta)`
    pub fn unpack(self) -> (u32, u32, u32) {
        (
            (self.0 >> ANCHOR_SHIFT) & FREQ_MASK,
            (self.0 >> TARGET_SHIFT) & FREQ_MASK,
            self.0 & DELTA_MASK,
        )
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Value stored in the `hash_value` INTEGER column
    pub fn to_db(self) -> i64 {
        i64::from(self.0)
    }

    /// Inverse of [`HashValue::to_db`]; `None` for values outside `u32`
    pub fn from_db(value: i64) -> Option<Self> {
        u32::try_from(value).ok().map(Self)
    }
}

impl From<HashValue> for u32 {
    fn from(value: HashValue) -> Self {
        value.0
    }
}
