//! Mono sample-rate conversion with rubato

use anyhow::{Context, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Input frames handed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

/// Resample mono PCM from `source_rate` to `target_rate`
///
/// High-quality sinc interpolation (256 taps, BlackmanHarris2 window). Output
/// sample `n` lines up with input time `n / target_rate`, and the output
/// length is `ceil(len * ratio)`.
///
/// In this chunked `process` / `process_partial` flow the sinc kernel is
/// already centred on the input, so nothing is trimmed from the front.
/// Trimming `output_delay()` would shift it early by half a filter length.
pub fn resample_mono(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    anyhow::ensure!(source_rate > 0 && target_rate > 0, "Sample rate must be > 0");

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(target_rate) / f64::from(source_rate);
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_FRAMES, 1)
        .context("Failed to create rubato resampler")?;

    let expected_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output: Vec<f32> = Vec::with_capacity(expected_len + CHUNK_FRAMES);

    let mut chunks = samples.chunks_exact(CHUNK_FRAMES);
    for chunk in &mut chunks {
        let out = resampler
            .process(&[chunk], None)
            .context("Rubato resampling failed")?;
        output.extend_from_slice(&out[0]);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let out = resampler
            .process_partial(Some(&[remainder]), None)
            .context("Rubato resampling failed")?;
        output.extend_from_slice(&out[0]);
    }

    // Flush the filter tail until the whole signal is out
    while output.len() < expected_len {
        let out = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .context("Rubato flush failed")?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
    }

    output.truncate(expected_len);

    tracing::debug!(
        input_frames = samples.len(),
        output_frames = output.len(),
        source_rate,
        target_rate,
        "Resampled mono audio"
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, rate: u32, secs: f32) -> Vec<f32> {
        let n = (rate as f32 * secs) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_same_rate_is_identity() {
        let input = sine(440.0, 22050, 0.1);
        assert_eq!(resample_mono(&input, 22050, 22050).unwrap(), input);
    }

    #[test]
    fn test_downsample_length_and_level() {
        let input = sine(440.0, 44100, 1.0);
        let output = resample_mono(&input, 44100, 22050).unwrap();
        assert_eq!(output.len(), 22050);

        // Away from the edges the tone keeps its amplitude
        let peak = output[2000..20000]
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.05, "peak {}", peak);
    }

    fn loudest(samples: &[f32]) -> usize {
        samples
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, &v)| if v.abs() > best.1 { (i, v.abs()) } else { best })
            .0
    }

    #[test]
    fn test_output_is_time_aligned() {
        // A click at 0.5 s must land near 0.5 s after conversion
        let mut input = vec![0.0f32; 48000];
        input[24000] = 1.0;
        let output = resample_mono(&input, 48000, 22050).unwrap();

        let idx = loudest(&output);
        assert!((idx as i64 - 11025).abs() <= 2, "click at {}", idx);
    }

    #[test]
    fn test_clicks_stay_aligned_across_chunks_at_44100() {
        // Clicks in the first chunk, mid-stream and in the partial tail chunk
        let len = 44100 * 2 + 700;
        for click in [300usize, 50_000, len - 400] {
            let mut input = vec![0.0f32; len];
            input[click] = 1.0;
            let output = resample_mono(&input, 44100, 22050).unwrap();
            assert_eq!(output.len(), (len + 1) / 2);

            let idx = loudest(&output) as i64;
            let expected = (click / 2) as i64;
            assert!((idx - expected).abs() <= 2, "click {} landed at {}", click, idx);
        }
    }
}
