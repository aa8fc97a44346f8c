use crate::config::Config;
use crate::error::{Result, WaveMarkError};
use crate::fft::{apply_window, fft_inplace, hann_window, real_to_complex};

/// A dB-scaled STFT magnitude spectrogram.
///
/// `frames[t][f]` is the magnitude, in dB, of frequency bin `f` at time
/// frame `t`. `n_freqs = window_size / 2 + 1` per spec section 4.2.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub freqs: Vec<f32>,
    pub times: Vec<f32>,
}

impl Spectrogram {
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_freqs(&self) -> usize {
        self.freqs.len()
    }

    pub fn magnitude(&self, time_idx: usize, freq_idx: usize) -> f32 {
        self.frames[time_idx][freq_idx]
    }
}

/// Runs the STFT: Hann-windowed, non-overlap-padded frames, magnitude in
/// dB, globally floored to `max(S_dB) - top_db`.
pub fn compute(samples: &[f32], sample_rate: u32, cfg: &Config) -> Result<Spectrogram> {
    let window_size = cfg.window_size;
    let hop_size = cfg.hop_size;
    let n_freqs = window_size / 2 + 1;
    let window = hann_window(window_size);

    let mut frames: Vec<Vec<f32>> = Vec::new();
    let mut times: Vec<f32> = Vec::new();

    let mut position = 0usize;
    while position + window_size <= samples.len() {
        let chunk = &samples[position..position + window_size];
        let windowed = apply_window(chunk, &window);

        let mut buf = real_to_complex(&windowed);
        fft_inplace(&mut buf);

        let mut frame_db = Vec::with_capacity(n_freqs);
        for bin in &buf[..n_freqs] {
            let magnitude = bin.magnitude();
            let db = 10.0 * (magnitude.max(1e-10) / 1.0).log10();
            frame_db.push(db);
        }

        times.push(position as f32 / sample_rate as f32);
        frames.push(frame_db);

        position += hop_size;
    }

    if frames.is_empty() {
        return Err(WaveMarkError::EmptyFingerprint);
    }

    let global_max = frames
        .iter()
        .flat_map(|f| f.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = global_max - cfg.top_db;
    for frame in frames.iter_mut() {
        for v in frame.iter_mut() {
            if *v < floor {
                *v = floor;
            }
        }
    }

    let freqs: Vec<f32> = (0..n_freqs)
        .map(|bin| bin as f32 * sample_rate as f32 / window_size as f32)
        .collect();

    debug_assert!(frames.iter().all(|f| f.iter().all(|v| v.is_finite())));

    Ok(Spectrogram {
        frames,
        freqs,
        times,
    })
}
