//! Audio decoding utilities
//!
//! Decodes any container/codec symphonia understands (WAV, FLAC, MP3, OGG,
//! AAC, ...) to mono f32 PCM at the file's native rate.

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
    /// Duration of the decoded samples in seconds
    pub duration_seconds: f64,
}

/// Decode an audio file to mono f32 PCM samples
///
/// Decoding stops once `max_duration_secs` of audio (at the native rate) has
/// been produced; `None` decodes the whole stream. Channels are averaged.
///
/// # Errors
/// * File cannot be opened
/// * Unsupported container or codec
/// * Corrupt stream that the decoder cannot skip past
pub fn decode_audio_file(file_path: &Path, max_duration_secs: Option<f64>) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open audio file: {}", file_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Failed to probe audio file: {}", file_path.display()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;
    let channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let sample_cap = max_duration_secs
        .map(|secs| (secs * f64::from(sample_rate)).ceil() as usize)
        .unwrap_or(usize::MAX);

    tracing::debug!(
        path = %file_path.display(),
        sample_rate,
        channels = channel_count,
        "Audio file info"
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Failed to create decoder for: {}", file_path.display()))?;

    let mut all_samples: Vec<f32> = Vec::new();

    while all_samples.len() < sample_cap {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "Error reading packet in: {}",
                    file_path.display()
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => mix_to_mono(&decoded, &mut all_samples),
            Err(SymphoniaError::DecodeError(reason)) => {
                // Corrupt frame; the decoder can resync on the next packet
                tracing::warn!(path = %file_path.display(), reason, "Skipping undecodable packet");
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "Failed to decode packet in: {}",
                    file_path.display()
                )));
            }
        }
    }

    all_samples.truncate(sample_cap);
    let duration_seconds = all_samples.len() as f64 / f64::from(sample_rate);

    tracing::debug!(
        path = %file_path.display(),
        total_samples = all_samples.len(),
        duration_seconds = format!("{:.2}", duration_seconds),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
        channels: channel_count,
        duration_seconds,
    })
}

/// Average all channels of a decoded buffer and append to `out`
fn mix_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => mix_buffer(&**buf, out),
        AudioBufferRef::U16(buf) => mix_buffer(&**buf, out),
        AudioBufferRef::U24(buf) => mix_buffer(&**buf, out),
        AudioBufferRef::U32(buf) => mix_buffer(&**buf, out),
        AudioBufferRef::S8(buf) => mix_buffer(&**buf, out),
        AudioBufferRef::S16(buf) => mix_buffer(&**buf, out),
        AudioBufferRef::S24(buf) => mix_buffer(&**buf, out),
        AudioBufferRef::S32(buf) => mix_buffer(&**buf, out),
        AudioBufferRef::F32(buf) => mix_buffer(&**buf, out),
        AudioBufferRef::F64(buf) => mix_buffer(&**buf, out),
    }
}

fn mix_buffer<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    if num_channels == 0 {
        return;
    }

    out.reserve(num_frames);
    for frame_idx in 0..num_frames {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += f32::from_sample(buf.chan(ch)[frame_idx]);
        }
        out.push(sum / num_channels as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_audio_file_not_found() {
        let result = decode_audio_file(Path::new("/nonexistent/file.wav"), None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to open audio file"));
    }

    #[test]
    fn test_garbage_bytes_fail_to_probe() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();

        let err = decode_audio_file(&path, None).unwrap_err();
        assert!(err.to_string().contains("Failed to probe"), "{:#}", err);
    }
}
