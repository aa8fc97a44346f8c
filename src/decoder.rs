use std::path::Path;

use symphonia::core::audio::{AudioBuffer, SampleBuffer, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Result, WaveMarkError};

/// Decodes an arbitrary container to mono `f32` PCM at `target_sr`, per
/// spec section 4.1. Stereo (or wider) is downmixed by channel averaging;
/// symphonia performs the integer-PCM-to-float rescale internally.
/// Resampling to `target_sr` reuses the teacher's own linear resampler.
pub fn decode_path<P: AsRef<Path>>(path: P, target_sr: u32) -> Result<(Vec<f32>, u32)> {
    let file = std::fs::File::open(path)?;
    decode_reader(Box::new(file), target_sr)
}

pub fn decode_bytes(bytes: Vec<u8>, target_sr: u32) -> Result<(Vec<f32>, u32)> {
    decode_reader(Box::new(std::io::Cursor::new(bytes)), target_sr)
}

fn decode_reader(
    source: Box<dyn symphonia::core::io::MediaSource>,
    target_sr: u32,
) -> Result<(Vec<f32>, u32)> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| WaveMarkError::Decode(format!("unsupported container: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.sample_rate.is_some())
        .ok_or_else(|| WaveMarkError::Decode("no decodable audio track found".into()))?
        .clone();

    let source_sr = track
        .codec_params
        .sample_rate
        .ok_or_else(|| WaveMarkError::Decode("track has no sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| WaveMarkError::Decode(format!("unsupported codec: {e}")))?;

    let mut mono_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(WaveMarkError::from(e)),
        };

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(WaveMarkError::from(e)),
        };

        let spec = *decoded.spec();
        let mut buffer = AudioBuffer::<f32>::new(decoded.capacity() as u64, spec);
        decoded.convert(&mut buffer);
        mono_samples.extend(downmix_to_mono(&buffer, spec));
    }

    if mono_samples.is_empty() {
        return Err(WaveMarkError::Decode("decoded zero audio frames".into()));
    }

    let resampled = if source_sr == target_sr {
        mono_samples
    } else {
        resample_linear(&mono_samples, source_sr, target_sr)
    };

    Ok((resampled, target_sr))
}

fn downmix_to_mono(buffer: &AudioBuffer<f32>, spec: SignalSpec) -> Vec<f32> {
    let n_channels = spec.channels.count().max(1);
    let n_frames = buffer.frames();

    if n_channels == 1 {
        let mut sample_buf = SampleBuffer::<f32>::new(n_frames as u64, spec);
        sample_buf.copy_interleaved_typed(buffer);
        return sample_buf.samples().to_vec();
    }

    let mut sample_buf = SampleBuffer::<f32>::new(n_frames as u64, spec);
    sample_buf.copy_interleaved_typed(buffer);
    let interleaved = sample_buf.samples();

    (0..n_frames)
        .map(|i| {
            let start = i * n_channels;
            let sum: f32 = interleaved[start..start + n_channels].iter().sum();
            sum / n_channels as f32
        })
        .collect()
}

/// Linear-interpolation resampler. Adequate for the coarse target rates
/// (11025 Hz by default) this engine fingerprints at; not a replacement for
/// a proper polyphase resampler if higher fidelity is ever needed.
pub(crate) fn resample_linear(samples: &[f32], source_sr: u32, target_sr: u32) -> Vec<f32> {
    if samples.is_empty() || source_sr == target_sr {
        return samples.to_vec();
    }

    let ratio = target_sr as f64 / source_sr as f64;
    let out_len = ((samples.len() as f64) * ratio).round() as usize;

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            let frac = (src_pos - idx as f64) as f32;
            if idx + 1 < samples.len() {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            } else {
                samples[samples.len() - 1]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_linear_preserves_length_when_rates_match() {
        let samples = vec![0.0, 1.0, 0.0, -1.0];
        let out = resample_linear(&samples, 11025, 11025);
        assert_eq!(out, samples);
    }

    #[test]
    fn resample_linear_scales_length_with_ratio() {
        let samples = vec![0.0; 1000];
        let out = resample_linear(&samples, 22050, 11025);
        assert!((out.len() as i64 - 500).abs() <= 1);
    }

    #[test]
    fn decode_path_on_missing_file_is_an_error() {
        let result = decode_path("/nonexistent/path/to/audio.wav", 11025);
        assert!(result.is_err());
    }
}
