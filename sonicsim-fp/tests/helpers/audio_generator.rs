//! Audio Test Fixture Generator
//!
//! Deterministic test signals written as 16-bit WAV files with hound

use std::f32::consts::PI;
use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

/// Analysis sample rate; signals generated at this rate skip resampling
pub const TEST_RATE: u32 = 22050;

/// Note length used by [`melody`]
const NOTE_SECONDS: f32 = 0.25;

/// Release length of each note and fade length of sweeps
const RAMP_SECONDS: f32 = 0.03;

/// Plucked-note envelope: short attack, exponential decay
const ATTACK_SECONDS: f32 = 0.01;
const DECAY_SECONDS: f32 = 0.06;

/// What to put in the file
#[derive(Debug, Clone)]
pub enum Signal {
    /// Pseudo-random note sequence between 220 and 660 Hz with a 2nd harmonic
    Melody { seed: u64 },
    /// Linear chirp
    Sweep { start_hz: f32, end_hz: f32 },
    /// Digital silence
    Silence,
}

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub channels: u16,
    pub signal: Signal,
    /// Drop this many leading samples (rendered at `sample_rate`)
    pub skip_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 8.0,
            sample_rate: TEST_RATE,
            channels: 1,
            signal: Signal::Melody { seed: 7 },
            skip_samples: 0,
        }
    }
}

/// Render `config` and write it to `path`
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let total = (config.duration_seconds * config.sample_rate as f32) as usize + config.skip_samples;
    let rendered = match config.signal {
        Signal::Melody { seed } => melody(seed, total, config.sample_rate),
        Signal::Sweep { start_hz, end_hz } => sweep(start_hz, end_hz, total, config.sample_rate),
        Signal::Silence => silence(total),
    };

    write_wav(path, &rendered[config.skip_samples..], config.sample_rate, config.channels)
}

/// Write mono `samples` to a 16-bit WAV, duplicated across `channels`
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value)?;
        }
    }
    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// `len` samples of a note sequence chosen by `seed`
///
/// Notes are pitched on a 20 Hz grid. Each is plucked (fast attack, then
/// decay) so its energy peaks at one frame, and fades out before the next
/// note so boundaries do not smear energy across the spectrum.
pub fn melody(seed: u64, len: usize, sample_rate: u32) -> Vec<f32> {
    let note_len = (NOTE_SECONDS * sample_rate as f32) as usize;
    let ramp = (RAMP_SECONDS * sample_rate as f32) as usize;
    let attack_len = (ATTACK_SECONDS * sample_rate as f32) as usize;
    let decay_len = DECAY_SECONDS * sample_rate as f32;
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut freq = 0.0f32;

    (0..len)
        .map(|i| {
            let pos = i % note_len;
            if pos == 0 {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                freq = 220.0 + 20.0 * ((state >> 33) % 23) as f32;
            }

            let attack = if pos < attack_len {
                0.5 - 0.5 * (PI * pos as f32 / attack_len as f32).cos()
            } else {
                (-((pos - attack_len) as f32) / decay_len).exp()
            };
            let release = if pos >= note_len - ramp {
                0.5 - 0.5 * (PI * (note_len - pos) as f32 / ramp as f32).cos()
            } else {
                1.0
            };
            let envelope = attack * release;

            let t = i as f64 / f64::from(sample_rate);
            let phase = TAU * f64::from(freq) * t;
            let tone = phase.sin() * 0.5 + (2.0 * phase).sin() * 0.25;
            tone as f32 * envelope
        })
        .collect()
}

/// `len` samples of a linear chirp from `start_hz` to `end_hz`, faded at both ends
pub fn sweep(start_hz: f32, end_hz: f32, len: usize, sample_rate: u32) -> Vec<f32> {
    let duration = len as f64 / f64::from(sample_rate);
    let rate = f64::from(end_hz - start_hz) / duration.max(f64::EPSILON);
    let ramp = ((RAMP_SECONDS * sample_rate as f32) as usize).min(len / 2).max(1);
    (0..len)
        .map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            let edge = i.min(len - 1 - i);
            let envelope = if edge < ramp {
                0.5 - 0.5 * (PI * edge as f32 / ramp as f32).cos()
            } else {
                1.0
            };
            let phase = TAU * (f64::from(start_hz) * t + 0.5 * rate * t * t);
            phase.sin() as f32 * 0.5 * envelope
        })
        .collect()
}

pub fn silence(len: usize) -> Vec<f32> {
    vec![0.0; len]
}
