//! Landmark pairing into packed hashes

use crate::config::HashingConfig;
use crate::models::{Fingerprint, FingerprintEntry, HashValue, Landmark};

/// Pairs each anchor landmark with up to `fan_out` later landmarks
#[derive(Debug, Clone)]
pub struct LandmarkHasher {
    config: HashingConfig,
}

impl LandmarkHasher {
    pub fn new(config: HashingConfig) -> Self {
        Self { config }
    }

    /// Hash every anchor/target pair within the pairing window
    ///
    /// Landmarks are stably sorted by time, so ties keep their input order.
    /// Targets in the same frame as the anchor are skipped; the scan stops at
    /// the first target more than `target_time_delta` frames away or after
    /// `fan_out` entries for the anchor. Entry offsets are anchor frames.
    pub fn hash_landmarks(&self, landmarks: &[Landmark]) -> Fingerprint {
        let mut sorted = landmarks.to_vec();
        sorted.sort_by_key(|l| l.time_frame);

        let max_delta = self.config.target_time_delta;
        let fan_out = self.config.fan_out;
        let mut fingerprint = Fingerprint::new();

        for (i, anchor) in sorted.iter().enumerate() {
            let mut emitted = 0;
            for target in &sorted[i + 1..] {
                let dt = target.time_frame - anchor.time_frame;
                if dt > max_delta {
                    break;
                }
                if dt == 0 {
                    continue;
                }

                match HashValue::pack(anchor.freq_bin, target.freq_bin, dt) {
                    Ok(hash) => {
                        fingerprint.push(FingerprintEntry::new(hash, anchor.time_frame));
                        emitted += 1;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping unpackable landmark pair");
                        continue;
                    }
                }

                if emitted >= fan_out {
                    break;
                }
            }
        }

        fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> LandmarkHasher {
        LandmarkHasher::new(HashingConfig::default())
    }

    #[test]
    fn test_empty_input() {
        assert!(hasher().hash_landmarks(&[]).is_empty());
    }

    #[test]
    fn test_single_pair() {
        let fp = hasher().hash_landmarks(&[Landmark::new(30, 4), Landmark::new(10, 1)]);
        assert_eq!(
            fp.entries(),
            &[FingerprintEntry::new(HashValue::pack(10, 30, 3).unwrap(), 1)]
        );
    }

    #[test]
    fn test_fan_out_bound() {
        let mut landmarks = vec![Landmark::new(1, 0)];
        landmarks.extend((0..40).map(|k| Landmark::new(100 + k, 1 + k)));

        let fp = hasher().hash_landmarks(&landmarks);
        let from_first_anchor = fp.iter().filter(|e| e.offset == 0).count();
        assert_eq!(from_first_anchor, 15);

        let mut per_offset = std::collections::HashMap::new();
        for entry in fp.iter() {
            *per_offset.entry(entry.offset).or_insert(0usize) += 1;
        }
        assert!(per_offset.values().all(|&n| n <= 15));
    }

    #[test]
    fn test_same_frame_targets_skipped() {
        let landmarks = [
            Landmark::new(1, 5),
            Landmark::new(2, 5),
            Landmark::new(3, 6),
        ];
        let fp = hasher().hash_landmarks(&landmarks);
        let unpacked: Vec<_> = fp.iter().map(|e| e.hash.unpack()).collect();
        assert_eq!(unpacked, vec![(1, 3, 1), (2, 3, 1)]);
    }

    #[test]
    fn test_pairing_window_breaks_scan() {
        let landmarks = [
            Landmark::new(1, 0),
            Landmark::new(2, 200),
            Landmark::new(3, 201),
        ];
        let fp = hasher().hash_landmarks(&landmarks);
        let anchor0: Vec<_> = fp.iter().filter(|e| e.offset == 0).collect();
        assert_eq!(anchor0.len(), 1);
        assert_eq!(anchor0[0].hash.unpack(), (1, 2, 200));
    }

    #[test]
    fn test_stable_sort_decides_targets() {
        // Two targets tie on time; with fan_out 1 the first in input order wins
        let config = HashingConfig {
            fan_out: 1,
            ..Default::default()
        };
        let landmarks = [
            Landmark::new(50, 3),
            Landmark::new(60, 3),
            Landmark::new(7, 0),
        ];
        let fp = LandmarkHasher::new(config).hash_landmarks(&landmarks);
        assert_eq!(fp.entries()[0].hash.unpack(), (7, 50, 3));
    }
}
