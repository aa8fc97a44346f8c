use crate::config::Config;
use crate::spectrogram::Spectrogram;

/// A local maximum in the dB spectrogram: `(time_idx, freq_idx)` plus its
/// magnitude, used both to build hashes and (optionally) to render a
/// constellation map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub time_idx: usize,
    pub freq_idx: usize,
    pub magnitude: f32,
}

/// Finds every point that equals the maximum of its `N x N` neighborhood
/// (default `N = peak_neighborhood_size`) and clears the `min_amplitude_db`
/// floor. Ties within a neighborhood resolve to the point that appears
/// first in scan order (time-major, then frequency), matching spec
/// section 4.3.
pub fn find_peaks(spec: &Spectrogram, cfg: &Config) -> Vec<Peak> {
    let half = cfg.peak_neighborhood_size / 2;
    let n_t = spec.n_frames();
    let n_f = spec.n_freqs();
    let mut peaks = Vec::new();

    for t in 0..n_t {
        let t_lo = t.saturating_sub(half);
        let t_hi = (t + half).min(n_t - 1);

        for f in 0..n_f {
            let value = spec.magnitude(t, f);
            if value < cfg.min_amplitude_db {
                continue;
            }

            let f_lo = f.saturating_sub(half);
            let f_hi = (f + half).min(n_f - 1);

            let mut is_peak = true;
            'neighborhood: for tt in t_lo..=t_hi {
                for ff in f_lo..=f_hi {
                    if tt == t && ff == f {
                        continue;
                    }
                    let other = spec.magnitude(tt, ff);
                    if other > value {
                        is_peak = false;
                        break 'neighborhood;
                    }
                    if other == value && (tt, ff) < (t, f) {
                        // An equal-valued point earlier in scan order already
                        // claims this neighborhood's peak.
                        is_peak = false;
                        break 'neighborhood;
                    }
                }
            }

            if is_peak {
                peaks.push(Peak {
                    time_idx: t,
                    freq_idx: f,
                    magnitude: value,
                });
            }
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram;

    fn sine_wave(freq: f32, sample_rate: u32, duration_secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * duration_secs) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn finds_peaks_for_a_pure_tone() {
        let cfg = Config::default();
        let samples = sine_wave(1000.0, cfg.sample_rate, 3.0);
        let spec = spectrogram::compute(&samples, cfg.sample_rate, &cfg).unwrap();
        let peaks = find_peaks(&spec, &cfg);
        assert!(!peaks.is_empty());
        // Every reported peak must clear the amplitude floor.
        for p in &peaks {
            assert!(p.magnitude >= cfg.min_amplitude_db);
        }
    }

    #[test]
    fn respects_amplitude_floor() {
        let cfg = Config {
            min_amplitude_db: 1000.0, // unreachable
            ..Config::default()
        };
        let samples = sine_wave(1000.0, cfg.sample_rate, 2.0);
        let spec = spectrogram::compute(&samples, cfg.sample_rate, &cfg).unwrap();
        let peaks = find_peaks(&spec, &cfg);
        assert!(peaks.is_empty());
    }
}
