//! Cached FFT plans and window functions (§4.A).
//!
//! Plan construction is serialized under a single mutex per direction;
//! execution against an already-built plan is lock-free (the `Arc<dyn
//! Fft<f32>>` is cloned out of the cache before `process` is called).

use lazy_static::lazy_static;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::WindowKind;

lazy_static! {
    static ref FORWARD_CACHE: Mutex<HashMap<usize, Arc<dyn Fft<f32>>>> = Mutex::new(HashMap::new());
    static ref INVERSE_CACHE: Mutex<HashMap<usize, Arc<dyn Fft<f32>>>> = Mutex::new(HashMap::new());
}

pub fn forward_plan(n: usize) -> Arc<dyn Fft<f32>> {
    let mut cache = FORWARD_CACHE.lock().unwrap();
    cache
        .entry(n)
        .or_insert_with(|| FftPlanner::new().plan_fft_forward(n))
        .clone()
}

pub fn inverse_plan(n: usize) -> Arc<dyn Fft<f32>> {
    let mut cache = INVERSE_CACHE.lock().unwrap();
    cache
        .entry(n)
        .or_insert_with(|| FftPlanner::new().plan_fft_inverse(n))
        .clone()
}

/// Forward FFT in place, unnormalized (matches `rustfft` convention).
pub fn fft_forward(buf: &mut [Complex<f32>]) {
    forward_plan(buf.len()).process(buf);
}

/// Inverse FFT in place, normalized by `1/n` so it is a true inverse of
/// [`fft_forward`].
pub fn fft_inverse(buf: &mut [Complex<f32>]) {
    let n = buf.len();
    inverse_plan(n).process(buf);
    let scale = 1.0 / n as f32;
    for c in buf.iter_mut() {
        *c *= scale;
    }
}

/// Real-input forward FFT convenience wrapper.
pub fn fft_real_forward(real: &[f32]) -> Vec<Complex<f32>> {
    let mut buf: Vec<Complex<f32>> = real.iter().map(|&r| Complex::new(r, 0.0)).collect();
    fft_forward(&mut buf);
    buf
}

/// Real part of an inverse FFT (discards residual imaginary rounding).
pub fn ifft_real(buf: &[Complex<f32>]) -> Vec<f32> {
    let mut owned = buf.to_vec();
    fft_inverse(&mut owned);
    owned.into_iter().map(|c| c.re).collect()
}

fn hamming(i: usize, nm1: usize) -> f32 {
    0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / nm1 as f32).cos()
}

fn blackman(i: usize, nm1: usize) -> f32 {
    let x = i as f32 / nm1 as f32;
    let tau = std::f32::consts::PI;
    0.42 - 0.5 * (2.0 * tau * x).cos() + 0.08 * (4.0 * tau * x).cos()
}

fn blackman_harris(i: usize, nm1: usize) -> f32 {
    let x = i as f32 / nm1 as f32;
    let tau = std::f32::consts::PI;
    0.35875 - 0.48829 * (2.0 * tau * x).cos() + 0.14128 * (4.0 * tau * x).cos()
        - 0.01168 * (6.0 * tau * x).cos()
}

/// Build an `n`-point window of the requested kind.
pub fn window(n: usize, kind: WindowKind) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    let nm1 = n.saturating_sub(1).max(1);
    match kind {
        WindowKind::Hamming => (0..n).map(|i| hamming(i, nm1)).collect(),
        WindowKind::Blackman => (0..n).map(|i| blackman(i, nm1)).collect(),
        WindowKind::BlackmanHarris => (0..n).map(|i| blackman_harris(i, nm1)).collect(),
        WindowKind::SymmetricBlackman => {
            let mut w: Vec<f32> = (0..n).map(|i| blackman(i, nm1)).collect();
            for i in 0..n / 2 {
                w[n - 1 - i] = w[i];
            }
            w
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_signal_has_single_bin() {
        let real = vec![1.0f32; 32];
        let spec = fft_real_forward(&real);
        assert!((spec[0].re - 32.0).abs() < 1e-3);
        for c in &spec[1..] {
            assert!(c.norm() < 1e-2);
        }
    }

    #[test]
    fn forward_inverse_roundtrip() {
        let n = 64;
        let real: Vec<f32> = (0..n).map(|i| (i as f32 * 0.3).sin()).collect();
        let spec = fft_real_forward(&real);
        let back = ifft_real(&spec);
        for (a, b) in real.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn symmetric_blackman_is_mirror_symmetric() {
        let w = window(65, WindowKind::SymmetricBlackman);
        for i in 0..w.len() {
            assert!((w[i] - w[w.len() - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn windows_peak_near_one_at_center() {
        for kind in [
            WindowKind::Hamming,
            WindowKind::Blackman,
            WindowKind::SymmetricBlackman,
            WindowKind::BlackmanHarris,
        ] {
            let w = window(101, kind);
            let center = w[50];
            assert!(center > 0.9, "{:?} center={}", kind, center);
        }
    }
}
