//! Fingerprint and landmark types

use super::hash_value::HashValue;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Local maximum in the spectrogram, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Landmark {
    /// FFT bin index
    pub freq_bin: u32,
    /// STFT frame index
    pub time_frame: u32,
}

impl Landmark {
    pub fn new(freq_bin: u32, time_frame: u32) -> Self {
        Self {
            freq_bin,
            time_frame,
        }
    }
}

/// One `(hash, time offset)` pair; the offset is the anchor's STFT frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub hash: HashValue,
    pub offset: u32,
}

impl FingerprintEntry {
    pub fn new(hash: HashValue, offset: u32) -> Self {
        Self { hash, offset }
    }
}

/// Acoustic fingerprint of one audio file
///
/// Entries keep generation order (anchor time ascending). Storage treats the
/// entries as a set and matching treats them as a multiset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint {
    entries: Vec<FingerprintEntry>,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<FingerprintEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: FingerprintEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FingerprintEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FingerprintEntry> {
        self.entries.iter()
    }

    /// Distinct hash values, used for corpus candidate lookup
    pub fn hash_set(&self) -> HashSet<HashValue> {
        self.entries.iter().map(|e| e.hash).collect()
    }
}

impl FromIterator<FingerprintEntry> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = FingerprintEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Fingerprint {
    type Item = &'a FingerprintEntry;
    type IntoIter = std::slice::Iter<'a, FingerprintEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Fingerprint {
    type Item = FingerprintEntry;
    type IntoIter = std::vec::IntoIter<FingerprintEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
