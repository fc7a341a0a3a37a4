//! Coarse search over a 2-D frequency/time sync-correlation matrix (§4.C).

use rustfft::num_complex::Complex;

use crate::config::Config;
use crate::constants::{block_len, COSTAS, COSTAS_STARTS};
use crate::fft::{fft_forward, window};
use crate::resample::fft_shift;

/// A coarse-search hit: frequency bin (in Hz) and time offset (in samples,
/// relative to `start`) with a relative sync strength.
#[derive(Debug, Clone, Copy)]
pub struct Coarse {
    pub hz: f32,
    pub offset: i64,
    pub strength: f32,
}

/// Per-symbol FFT magnitude grid: `bins[si][bi]`, one row per symbol step.
struct Spectra {
    bins: Vec<Vec<f32>>,
    bin_hz: f32,
    nbins: usize,
}

fn compute_spectra(samples: &[f32], rate: u32, cfg: &Config) -> Spectra {
    let block = block_len(rate as f32);
    let nfft = block.next_power_of_two();
    let win = window(block, cfg.window);
    let bin_hz = rate as f32 / nfft as f32;
    let nsteps = if samples.len() >= block { samples.len() / block } else { 0 };

    let mut bins = Vec::with_capacity(nsteps);
    for si in 0..nsteps {
        let ia = si * block;
        let mut buf: Vec<Complex<f32>> = (0..nfft)
            .map(|i| {
                if i < block {
                    Complex::new(samples[ia + i] * win[i], 0.0)
                } else {
                    Complex::new(0.0, 0.0)
                }
            })
            .collect();
        fft_forward(&mut buf);
        bins.push(buf.iter().map(|c| c.norm()).collect());
    }

    Spectra { bins, bin_hz, nbins: nfft }
}

/// Costas-tone-sum vs. opposite-tone-sum ratio at frequency bin `bi`,
/// symbol step `si`, using Costas arrays starting at `starts`.
/// Zero denominator yields strength `1.0` (§9 tie-break degeneracy).
fn strength(spectra: &Spectra, bi: i64, si: i64, starts: &[usize]) -> f32 {
    let mut signal = 0.0f32;
    let mut opposite = 0.0f32;
    for &start in starts {
        for (s, &tone) in COSTAS.iter().enumerate() {
            let row = si + start as i64 + s as i64;
            if row < 0 || row as usize >= spectra.bins.len() {
                continue;
            }
            let row = &spectra.bins[row as usize];
            for t in 0..8u8 {
                let col = bi + t as i64;
                if col < 0 || col as usize >= row.len() {
                    continue;
                }
                let mag = row[col as usize];
                if t == tone {
                    signal += mag;
                } else {
                    opposite += mag;
                }
            }
        }
    }
    if opposite > 0.0 {
        signal / opposite
    } else {
        1.0
    }
}

/// Larger of the full three-Costas-block strength and the last-two-block
/// strength (tolerates a candidate whose first sync block lies partly
/// before the window, §4.C).
fn strength_best(spectra: &Spectra, bi: i64, si: i64) -> f32 {
    let full = strength(spectra, bi, si, &COSTAS_STARTS);
    let tail = strength(spectra, bi, si, &COSTAS_STARTS[1..]);
    full.max(tail)
}

/// Search one pass (no fractional-bin/offset shifting) and return up to
/// `ncoarse` peaks per frequency column, separated by at least
/// `ncoarse_blocks` symbol steps. `si` ranges over `[start, tminus,
/// tplus]` converted to block units: `si0 = (start - tminus·r)/block`,
/// `si1 = (start + tplus·r)/block` (§4.C).
fn search_pass(spectra: &Spectra, min_hz: f32, max_hz: f32, start: i64, tminus: f32, tplus: f32, block: usize, rate: u32, cfg: &Config) -> Vec<Coarse> {
    let bi0 = (min_hz / spectra.bin_hz).floor() as i64;
    let bi1 = (max_hz / spectra.bin_hz).ceil() as i64;
    let si0 = ((start as f32 - tminus * rate as f32) / block as f32).floor() as i64;
    let si1 = ((start as f32 + tplus * rate as f32) / block as f32).ceil() as i64;

    let mut out = Vec::new();
    for bi in bi0..bi1 {
        let mut column: Vec<(i64, f32)> = Vec::new();
        for si in si0..si1 {
            column.push((si, strength_best(spectra, bi, si)));
        }
        column.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let mut kept: Vec<(i64, f32)> = Vec::new();
        for &(si, s) in &column {
            if kept.len() >= cfg.ncoarse {
                break;
            }
            let min_sep = cfg.ncoarse_blocks as i64;
            if kept.iter().all(|&(ksi, _)| (ksi - si).abs() >= min_sep) {
                kept.push((si, s));
            }
        }
        for (si, s) in kept {
            out.push(Coarse {
                hz: bi as f32 * spectra.bin_hz,
                offset: si * block as i64,
                strength: s,
            });
        }
    }
    out
}

fn merge_close(mut candidates: Vec<Coarse>, hz_tol: f32, offset_tol: i64) -> Vec<Coarse> {
    candidates.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap());
    let mut kept: Vec<Coarse> = Vec::new();
    for c in candidates {
        let dup = kept.iter().any(|k| (k.hz - c.hz).abs() < hz_tol && (k.offset - c.offset).abs() < offset_tol);
        if !dup {
            kept.push(c);
        }
    }
    kept
}

/// Coarse search over `samples` (at `rate` sps), within `[min_hz, max_hz]`
/// and `start ± (tminus, tplus)` seconds, merging `coarse_hz_fracs`
/// sub-bin frequency passes and `coarse_off_fracs` sub-block time passes.
pub fn coarse_search(samples: &[f32], rate: u32, start: i64, min_hz: f32, max_hz: f32, cfg: &Config) -> Vec<Coarse> {
    let block = block_len(rate as f32);
    let bin_hz_est = rate as f32 / block.next_power_of_two() as f32;

    let mut all = Vec::new();
    for hf in 0..cfg.coarse_hz_fracs.max(1) {
        let hz_shift = hf as f32 * bin_hz_est / cfg.coarse_hz_fracs.max(1) as f32;
        let shifted = if hz_shift > 0.0 {
            fft_shift(samples, rate as f32, -hz_shift, None)
        } else {
            samples.to_vec()
        };
        for of in 0..cfg.coarse_off_fracs.max(1) {
            let off_shift = (of as f32 * block as f32 / cfg.coarse_off_fracs.max(1) as f32) as usize;
            let slice = if off_shift < shifted.len() {
                &shifted[off_shift..]
            } else {
                continue;
            };
            let start_in_slice = start - off_shift as i64;
            let spectra = compute_spectra(slice, rate, cfg);
            let mut pass = search_pass(&spectra, min_hz, max_hz, start_in_slice, cfg.tminus, cfg.tplus, block, rate, cfg);
            for c in &mut pass {
                c.hz += hz_shift;
                c.offset += off_shift as i64;
            }
            all.extend(pass);
        }
    }

    merge_close(all, bin_hz_est, block as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth_tone_block(freq_bin_hz: f32, rate: u32, nblocks: usize) -> Vec<f32> {
        let block = block_len(rate as f32);
        let mut out = Vec::with_capacity(block * nblocks);
        let mut phase = 0.0f32;
        for _ in 0..nblocks {
            for _ in 0..block {
                out.push(phase.sin());
                phase += 2.0 * std::f32::consts::PI * freq_bin_hz / rate as f32;
            }
        }
        out
    }

    #[test]
    fn finds_no_candidates_in_pure_noise_below_threshold() {
        let cfg = Config::default();
        let samples = vec![0.0f32; block_len(1000.0) * 80];
        let hits = coarse_search(&samples, 1000, 0, 100.0, 400.0, &cfg);
        assert!(hits.iter().all(|h| h.strength <= 1.0));
    }

    #[test]
    fn strength_is_finite_for_constant_tone() {
        let tone = synth_tone_block(150.0, 1000, 80);
        let cfg = Config::default();
        let hits = coarse_search(&tone, 1000, 0, 50.0, 300.0, &cfg);
        assert!(hits.iter().all(|h| h.strength.is_finite()));
    }
}
