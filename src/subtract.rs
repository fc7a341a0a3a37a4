//! Subtract a decoded signal from the working buffer so weaker signals at
//! nearby frequencies can be found in a later pass (§4.H), grounded on the
//! reference's `subtract()`.

use rustfft::num_complex::Complex;

use crate::config::Config;
use crate::constants::{block_len, CHANNEL_SYMBOLS_COUNT, TONE_SPACING};
use crate::fft::{fft_forward, fft_inverse};
use crate::resample::hilbert_shift;

/// Per-symbol-block complex spectrum, one FFT per 79-symbol block
/// starting at `off0`.
fn block_ffts(samples: &[f32], off0: i64, block: usize) -> Vec<Vec<Complex<f32>>> {
    let mut out = Vec::with_capacity(CHANNEL_SYMBOLS_COUNT);
    for si in 0..CHANNEL_SYMBOLS_COUNT {
        let start = off0 + (si as i64) * block as i64;
        let mut buf = vec![Complex::new(0.0f32, 0.0); block];
        if start >= 0 {
            let start = start as usize;
            if start + block <= samples.len() {
                for (i, s) in buf.iter_mut().enumerate() {
                    *s = Complex::new(samples[start + i], 0.0);
                }
            }
        }
        fft_forward(&mut buf);
        out.push(buf);
    }
    out
}

/// Median amplitude of the decoded tone across a `±sub_amp_win`
/// neighborhood of symbols, per symbol.
fn nearby_amplitude(bins: &[Vec<Complex<f32>>], symbols: &[u8; CHANNEL_SYMBOLS_COUNT], bin0: i64, win: i64) -> [f32; CHANNEL_SYMBOLS_COUNT] {
    let mut out = [0.0f32; CHANNEL_SYMBOLS_COUNT];
    for si in 0..CHANNEL_SYMBOLS_COUNT {
        let mut v = Vec::new();
        for i in -win..=win {
            let j = si as i64 + i;
            if j >= 0 && (j as usize) < CHANNEL_SYMBOLS_COUNT {
                let bin = (bin0 + symbols[j as usize] as i64) as usize;
                if bin < bins[j as usize].len() {
                    v.push(bins[j as usize][bin].norm());
                }
            }
        }
        v.sort_by(|a, b| a.partial_cmp(b).unwrap());
        out[si] = if v.is_empty() { 0.0 } else { v[v.len() / 2] };
    }
    out
}

/// Circular-distance "median" phase across a `±sub_phase_win`
/// neighborhood: the sample minimizing total wrapped distance to the
/// others (avoids the -pi/+pi wraparound a plain median would suffer).
fn nearby_phase(bins: &[Vec<Complex<f32>>], symbols: &[u8; CHANNEL_SYMBOLS_COUNT], bin0: i64, win: i64) -> [f32; CHANNEL_SYMBOLS_COUNT] {
    let phase_at = |si: usize| -> f32 {
        let bin = (bin0 + symbols[si] as i64) as usize;
        bins[si].get(bin).map(|c| c.arg()).unwrap_or(0.0)
    };
    let mut out = [0.0f32; CHANNEL_SYMBOLS_COUNT];
    for si in 0..CHANNEL_SYMBOLS_COUNT {
        let mut v = Vec::new();
        for i in -win..=win {
            let j = si as i64 + i;
            if j >= 0 && (j as usize) < CHANNEL_SYMBOLS_COUNT {
                v.push(phase_at(j as usize));
            }
        }
        let mut best = 0usize;
        let mut best_score = f32::MAX;
        for (i, &vi) in v.iter().enumerate() {
            let score: f32 = v
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &vj)| {
                    let d = (vi - vj).abs();
                    if d > std::f32::consts::PI {
                        2.0 * std::f32::consts::PI - d
                    } else {
                        d
                    }
                })
                .sum();
            if score < best_score {
                best_score = score;
                best = i;
            }
        }
        out[si] = v[best];
    }
    out
}

/// Subtract the decoded 79-symbol tone sequence (`symbols`, channel tone
/// 0..8 per symbol) from `samples` (at `rate` sps), whose carrier spans
/// `[hz0, hz1]` and which starts at `off_samples`.
///
/// Two modes (kept as distinct strategies, never merged, per §9):
/// - simple: zero (or attenuate toward the estimated noise floor) the
///   decoded tone's FFT bin, then inverse-FFT that symbol block back.
/// - fancy (`fancy_subtract`): synthesize the tone as a time-domain
///   cosine at the bin's estimated amplitude/phase and subtract it
///   directly from the waveform.
pub fn subtract(samples: &mut [f32], rate: f32, hz0: f32, hz1: f32, off_samples: i64, symbols: &[u8; CHANNEL_SYMBOLS_COUNT], cfg: &Config) {
    let block = block_len(rate);
    let bin_hz = rate / block as f32;
    let mhz = (hz0 + hz1) / 2.0;
    let bin0 = (mhz / bin_hz).round() as i64;

    let diff0 = bin0 as f32 * bin_hz - hz0;
    let diff1 = bin0 as f32 * bin_hz - hz1;
    let mut moved = hilbert_shift(samples, diff0, diff1, rate);

    let bins = block_ffts(&moved, off_samples, block);
    if bin0 < 0 || (bin0 as usize) + 8 > bins[0].len() {
        return;
    }

    let amp_win = cfg.sub_amp_win as i64;
    let phase_win = cfg.sub_phase_win as i64;
    let nearby_amp = if amp_win > 0 {
        Some(nearby_amplitude(&bins, symbols, bin0, amp_win))
    } else {
        None
    };
    let nearby_ph = if cfg.fancy_subtract && phase_win > 0 {
        Some(nearby_phase(&bins, symbols, bin0, phase_win))
    } else {
        None
    };

    for si in 0..CHANNEL_SYMBOLS_COUNT {
        let sym_bin = (bin0 + symbols[si] as i64) as usize;
        if sym_bin >= bins[si].len() {
            continue;
        }
        let c = bins[si][sym_bin];
        let start = off_samples + (si as i64) * block as i64;

        if cfg.fancy_subtract {
            let phase = nearby_ph.map(|p| p[si]).unwrap_or_else(|| c.arg());
            let amp = nearby_amp.map(|a| a[si]).unwrap_or_else(|| c.norm());
            let amp = amp / (block as f32 / 2.0);
            let tone_hz = TONE_SPACING * (bin0 + symbols[si] as i64) as f32;
            let mut theta = phase;
            let dtheta = 2.0 * std::f32::consts::PI * tone_hz / rate;
            for jj in 0..block {
                let idx = start + jj as i64;
                if idx >= 0 && (idx as usize) < moved.len() {
                    moved[idx as usize] -= amp * theta.cos();
                }
                theta += dtheta;
            }
        } else {
            let mut sym_bins = bins[si].clone();
            if amp_win > 0 {
                let aa = c.norm();
                let amp = nearby_amp.map(|a| a[si]).unwrap_or(0.0).min(aa);
                if aa > 0.0 {
                    sym_bins[sym_bin] = sym_bins[sym_bin] / aa * (aa - amp);
                }
            } else {
                sym_bins[sym_bin] = Complex::new(0.0, 0.0);
            }
            fft_inverse(&mut sym_bins);
            for jj in 0..block {
                let idx = start + jj as i64;
                if idx >= 0 && (idx as usize) < moved.len() {
                    moved[idx as usize] = sym_bins[jj].re;
                }
            }
        }
    }

    let restored = hilbert_shift(&moved, -diff0, -diff1, rate);
    samples.copy_from_slice(&restored[..samples.len().min(restored.len())]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth(rate: f32, symbols: &[u8; CHANNEL_SYMBOLS_COUNT], hz0: f32) -> Vec<f32> {
        let block = block_len(rate);
        let mut out = Vec::with_capacity(block * CHANNEL_SYMBOLS_COUNT);
        for &tone in symbols {
            let freq = hz0 + tone as f32 * TONE_SPACING;
            let dphi = 2.0 * std::f32::consts::PI * freq / rate;
            let mut phase = 0.0f32;
            for _ in 0..block {
                out.push(phase.sin());
                phase += dphi;
            }
        }
        out
    }

    #[test]
    fn simple_subtract_reduces_energy_at_decoded_tones() {
        let rate = 2000.0f32;
        let symbols = [3u8; CHANNEL_SYMBOLS_COUNT];
        let hz0 = 400.0;
        let hz1 = hz0 + 50.0;
        let mut samples = synth(rate, &symbols, hz0);
        let before: f32 = samples.iter().map(|x| x * x).sum();

        let cfg = Config::default();
        subtract(&mut samples, rate, hz0, hz1, 0, &symbols, &cfg);

        let after: f32 = samples.iter().map(|x| x * x).sum();
        assert!(after < before, "subtract should reduce signal energy: {after} vs {before}");
    }
}
