pub mod complex;

use complex::Complex;
use std::f32::consts::PI;

/// Radix-2 Cooley-Tukey FFT. `buf.len()` must be a power of two.
pub fn fft_inplace(buf: &mut [Complex]) {
    let n = buf.len();

    if n <= 1 {
        return;
    }
    if !n.is_power_of_two() {
        panic!("fft_inplace: buffer length must be a power of two, got {}", n);
    }

    let mut even: Vec<Complex> = Vec::with_capacity(n / 2);
    let mut odd: Vec<Complex> = Vec::with_capacity(n / 2);

    for (i, &sample) in buf.iter().enumerate() {
        if i % 2 == 0 {
            even.push(sample);
        } else {
            odd.push(sample);
        }
    }

    fft_inplace(&mut even);
    fft_inplace(&mut odd);

    // P(omega)  = Pe(omega^2) + omega * Po(omega^2)
    // P(-omega) = Pe(omega^2) - omega * Po(omega^2)
    // where omega = e^(-i*2*pi*k/n) (negative angle for the forward transform)
    for j in 0..n / 2 {
        let theta = (2.0 * PI * (j as f32)) / (n as f32);
        let twiddle = Complex::from_polar(1.0, -theta);

        buf[j] = even[j] + (twiddle * odd[j]);
        buf[j + n / 2] = even[j] - (twiddle * odd[j]);
    }
}

pub fn real_to_complex(samples: &[f32]) -> Vec<Complex> {
    samples.iter().map(|&s| Complex::new(s, 0.0)).collect()
}

/// Symmetric Hann window: w[i] = 0.5 - 0.5*cos(2*pi*i/(n-1)).
pub fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * (i as f32) / ((n - 1) as f32);
            0.5 - 0.5 * phase.cos()
        })
        .collect()
}

pub fn apply_window(samples: &[f32], window: &[f32]) -> Vec<f32> {
    samples
        .iter()
        .zip(window.iter())
        .map(|(&s, &w)| s * w)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_window_endpoints_are_zero() {
        let w = hann_window(8);
        assert!(w[0].abs() < 1e-6);
        assert!(w[w.len() - 1].abs() < 1e-6);
        // Peak near the middle should be close to 1.0
        assert!(w[4] > 0.9);
    }

    #[test]
    fn fft_of_dc_signal_has_energy_only_in_bin_zero() {
        let samples = vec![1.0f32; 8];
        let mut buf = real_to_complex(&samples);
        fft_inplace(&mut buf);
        assert!(buf[0].magnitude() > 7.0);
        for c in &buf[1..] {
            assert!(c.magnitude() < 1e-3);
        }
    }

    #[test]
    fn fft_detects_single_tone_bin() {
        let n = 64;
        // One full cycle over n samples lands exactly on bin 1.
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * i as f32 / n as f32).sin())
            .collect();
        let mut buf = real_to_complex(&samples);
        fft_inplace(&mut buf);
        let mags: Vec<f32> = buf.iter().map(|c| c.magnitude()).collect();
        let (peak_bin, _) = mags[..n / 2]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert_eq!(peak_bin, 1);
    }
}
