//! Rate reduction and fractional-Hz frequency shifting (§4.B).

use rustfft::num_complex::Complex;

use crate::config::{Config, SUPPORTED_RATES};
use crate::fft::{fft_forward, fft_inverse, window};

/// Choose the smallest supported internal rate that keeps the band
/// `[hz0, hz1]` (plus a 50 Hz guard for the signal's own bandwidth) under
/// `NYQUIST_FRACTION` of Nyquist.
pub fn choose_rate(hz0: f32, hz1: f32) -> u32 {
    let span = hz1 - hz0 + 50.0;
    for &r in &SUPPORTED_RATES {
        if span < crate::config::NYQUIST_FRACTION * r as f32 / 2.0 {
            return r;
        }
    }
    *SUPPORTED_RATES.last().unwrap()
}

/// Raised-cosine taper value in `[0, 1]` for a point a fraction `t` of the
/// way through a transition band (`t` clamped to `[0, 1]`).
fn raised_cosine(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    0.5 - 0.5 * (std::f32::consts::PI * t).cos()
}

/// Result of [`reduce_rate`]: the resampled signal and the Hz offset that
/// was applied (add this back to any frequency measured in the new
/// signal to recover the frequency in the original signal's axis).
pub struct Reduced {
    pub samples: Vec<f32>,
    pub delta_hz: f32,
    pub rate: f32,
}

/// Reduce `a` (at `arate` sps) to `brate` sps, keeping only the band
/// `[hz0, hz1]` (with a taper of width `shoulder`, or a midpoint-symmetric
/// fallback sized by `reduce_factor` if `shoulder <= 0`), and translating
/// that band so its midpoint lands at `brate/4`.
pub fn reduce_rate(a: &[f32], hz0: f32, hz1: f32, arate: f32, brate: f32, cfg: &Config) -> Reduced {
    let spec = fft_forward_padded(a);
    let n = spec.len();
    let bin_hz = arate / n as f32;

    let (lo, hi) = if cfg.reduce_shoulder > 0.0 {
        (hz0 - cfg.reduce_shoulder, hz1 + cfg.reduce_shoulder)
    } else {
        let half = brate * cfg.reduce_factor / 2.0;
        (hz0 - half, hz1 + half)
    };
    let inner_lo = hz0 - cfg.reduce_extra;
    let inner_hi = hz1 + cfg.reduce_extra;

    let mut tapered = vec![Complex::new(0.0f32, 0.0); n];
    let shoulder_bins = ((inner_lo - lo) / bin_hz).max(1.0);
    let shoulder_bins_hi = ((hi - inner_hi) / bin_hz).max(1.0);
    for i in 0..n {
        let hz = i as f32 * bin_hz;
        let gain = if hz < lo || hz > hi {
            0.0
        } else if cfg.reduce_how == 3 {
            1.0
        } else if hz < inner_lo {
            raised_cosine((hz - lo) / shoulder_bins / bin_hz)
        } else if hz > inner_hi {
            raised_cosine((hi - hz) / shoulder_bins_hi / bin_hz)
        } else {
            1.0
        };
        if gain > 0.0 {
            tapered[i] = spec[i] * gain;
        }
    }

    let omid = ((hz0 + hz1) / 2.0) / bin_hz;
    let nmid = (brate / 4.0) / bin_hz;
    let delta = (omid - nmid).round() as i64;

    let out_len = ((a.len() as f32) * brate / arate).round().max(1.0) as usize;
    let out_bins = out_len;
    let mut shifted = vec![Complex::new(0.0f32, 0.0); out_bins];
    for i in 0..out_bins {
        let j = i as i64 + delta;
        if j >= 0 && (j as usize) < n {
            shifted[i] = tapered[j as usize];
        }
    }

    let samples = crate::fft::ifft_real(&shifted);
    Reduced {
        samples,
        delta_hz: delta as f32 * bin_hz,
        rate: brate,
    }
}

fn fft_forward_padded(a: &[f32]) -> Vec<Complex<f32>> {
    let n = a.len().next_power_of_two();
    let mut buf: Vec<Complex<f32>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buf.resize(n, Complex::new(0.0, 0.0));
    fft_forward(&mut buf);
    buf
}

/// Forward-FFT `samples`, translate bins by `round(hz/bin_hz)` (dropping
/// bins that fall outside range — wrap-around is explicitly undefined),
/// inverse-FFT. `rate` is the sample rate of `samples`.
///
/// The reference implementation memoizes the forward FFT by input
/// pointer; this crate instead takes an optional precomputed spectrum
/// from the caller (§9 Design Notes).
pub fn fft_shift(samples: &[f32], rate: f32, hz: f32, precomputed: Option<&[Complex<f32>]>) -> Vec<f32> {
    let n = samples.len();
    let owned;
    let bins: &[Complex<f32>] = match precomputed {
        Some(p) if p.len() == n => p,
        _ => {
            owned = fft_forward_padded_exact(samples);
            &owned
        }
    };

    let bin_hz = rate / n as f32;
    let down = (hz / bin_hz).round() as i64;
    let mut shifted = vec![Complex::new(0.0f32, 0.0); n];
    for i in 0..n {
        let j = i as i64 + down;
        if j >= 0 && (j as usize) < n {
            shifted[i] = bins[j as usize];
        }
    }
    let mut buf = shifted;
    fft_inverse(&mut buf);
    buf.into_iter().map(|c| c.re).collect()
}

fn fft_forward_padded_exact(a: &[f32]) -> Vec<Complex<f32>> {
    let mut buf: Vec<Complex<f32>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft_forward(&mut buf);
    buf
}

/// Shift a 200 sps downsampled buffer so `hz` lands on bin 4 (25 Hz).
pub fn shift200(samples200: &[f32], hz: f32) -> Vec<f32> {
    if (hz - 25.0).abs() < 0.001 {
        return samples200.to_vec();
    }
    fft_shift(samples200, 200.0, hz - 25.0, None)
}

/// Shift frequency by an amount that ramps linearly from `hz0` (at the
/// start of the buffer) to `hz1` (at its end) — an analytic-signal phase
/// ramp, used to capture drift when centering a candidate (§4.H) or
/// probing drift in the fine search (§4.D).
pub fn hilbert_shift(samples: &[f32], hz0: f32, hz1: f32, rate: f32) -> Vec<f32> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }
    // Build the analytic signal via a one-sided spectrum, then apply a
    // time-varying phase de-rotation.
    let mut buf: Vec<Complex<f32>> = samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
    let nfft = n;
    fft_forward(&mut buf);
    let half = nfft / 2;
    for (i, c) in buf.iter_mut().enumerate() {
        if i == 0 || (nfft % 2 == 0 && i == half) {
            // DC / Nyquist stay as-is
        } else if i < half {
            *c *= 2.0;
        } else {
            *c = Complex::new(0.0, 0.0);
        }
    }
    fft_inverse(&mut buf);

    let mut out = vec![0.0f32; n];
    for i in 0..n {
        let t = i as f32 / (n.max(2) - 1) as f32;
        let hz = hz0 + (hz1 - hz0) * t;
        let phase = -2.0 * std::f32::consts::PI * hz * (i as f32) / rate;
        let rot = Complex::new(phase.cos(), phase.sin());
        out[i] = (buf[i] * rot).re;
    }
    out
}

pub fn window_vec(n: usize, cfg: &Config) -> Vec<f32> {
    window(n, cfg.window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose_rate_picks_smallest_viable() {
        assert_eq!(choose_rate(1490.0, 1510.0), 1000);
        assert_eq!(choose_rate(300.0, 2950.0), 6000);
    }

    #[test]
    fn fft_shift_roundtrip() {
        let n = 256;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 10.0 * i as f32 / n as f32).sin())
            .collect();
        let shifted = fft_shift(&samples, n as f32, 5.0, None);
        let back = fft_shift(&shifted, n as f32, -5.0, None);
        for (a, b) in samples.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-2, "{} vs {}", a, b);
        }
    }

    #[test]
    fn shift200_identity_when_already_centered() {
        let samples = vec![1.0f32, 2.0, 3.0, 4.0];
        let out = shift200(&samples, 25.0);
        assert_eq!(out, samples);
    }

    #[test]
    fn reduce_rate_shrinks_length_roughly() {
        let cfg = Config::default();
        let n = 8192;
        let a: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 1500.0 * i as f32 / 6000.0).sin())
            .collect();
        let r = reduce_rate(&a, 1490.0, 1510.0, 6000.0, 1000.0, &cfg);
        let expected = (n as f32 * 1000.0 / 6000.0).round() as usize;
        assert_eq!(r.samples.len(), expected);
    }
}
