//! Soft demodulator: 79×8 tone-magnitude grid to 174 LLRs (§4.E).

use rustfft::num_complex::Complex;

use crate::apriori::priors;
use crate::config::{Config, SnrHow};
use crate::constants::{CHANNEL_SYMBOLS_COUNT, COSTAS, COSTAS_STARTS};
use crate::distribution::Distribution;
use crate::fft::{fft_forward, window, WindowKind};
use crate::symbol::tone_to_bits;

const SYM_LEN: usize = 32;

/// `c79[si][t]` magnitude for symbol `si`, tone `t`.
fn tone_magnitudes(samples200: &[f32], off: i64) -> [[f32; 8]; CHANNEL_SYMBOLS_COUNT] {
    let mut grid = [[0.0f32; 8]; CHANNEL_SYMBOLS_COUNT];
    for (si, row) in grid.iter_mut().enumerate() {
        let start = off + (si as i64) * SYM_LEN as i64;
        if start < 0 || (start as usize) + SYM_LEN > samples200.len() {
            continue;
        }
        let mut buf: Vec<Complex<f32>> = samples200[start as usize..start as usize + SYM_LEN]
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        fft_forward(&mut buf);
        for (t, m) in row.iter_mut().enumerate() {
            *m = buf[4 + t].norm();
        }
    }
    grid
}

fn noise_scalar(row: &[f32; 8], how: SnrHow) -> f32 {
    let mut sorted = *row;
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    match how {
        SnrHow::Median => (sorted[3] + sorted[4]) / 2.0,
        SnrHow::Mean => row.iter().sum::<f32>() / 8.0,
        SnrHow::MeanWeakest7 => sorted[..7].iter().sum::<f32>() / 7.0,
        SnrHow::Weakest => sorted[0],
        SnrHow::Strongest => sorted[7],
        SnrHow::SecondStrongest => sorted[6],
    }
}

/// `convert_to_snr`: normalize each symbol's tone magnitudes by a
/// Blackman-windowed average of per-symbol noise scalars over a
/// `±snr_win` neighborhood (falling back to the symbol's own scalar at
/// the edges of the 79-symbol range).
fn convert_to_snr(grid: &[[f32; 8]; CHANNEL_SYMBOLS_COUNT], cfg: &Config) -> [[f32; 8]; CHANNEL_SYMBOLS_COUNT] {
    let n = CHANNEL_SYMBOLS_COUNT;
    let scalars: Vec<f32> = grid.iter().map(|row| noise_scalar(row, cfg.snr_how)).collect();
    let win_len = 2 * cfg.snr_win + 1;
    let taper = window(win_len, WindowKind::Blackman);

    let mut out = [[0.0f32; 8]; CHANNEL_SYMBOLS_COUNT];
    for si in 0..n {
        let lo = si.saturating_sub(cfg.snr_win);
        let hi = (si + cfg.snr_win).min(n - 1);
        let mut acc = 0.0f32;
        let mut wsum = 0.0f32;
        for j in lo..=hi {
            let widx = (j as i64 - si as i64 + cfg.snr_win as i64) as usize;
            let w = taper.get(widx).copied().unwrap_or(1.0);
            acc += scalars[j] * w;
            wsum += w;
        }
        let denom = if wsum > 0.0 { acc / wsum } else { scalars[si] };
        let denom = if denom > 0.0 { denom } else { scalars[si].max(1e-12) };
        for t in 0..8 {
            out[si][t] = grid[si][t] / denom;
        }
    }
    out
}

fn costas_tone_at(si: usize) -> Option<u8> {
    COSTAS_STARTS
        .iter()
        .find(|&&s| si >= s && si < s + 7)
        .map(|&s| COSTAS[si - s])
}

/// Per-slice `bests`/`noises` empirical distributions (§4.E step 3).
struct SliceStats {
    bests: Distribution,
    noises: Distribution,
}

fn slice_bounds(cfg: &Config) -> Vec<(usize, usize)> {
    let n = CHANNEL_SYMBOLS_COUNT;
    let ranges = cfg.soft_ranges.max(1);
    let per = n / ranges;
    let mut bounds = Vec::with_capacity(ranges);
    for r in 0..ranges {
        let lo = r * per;
        let hi = if r == ranges - 1 { n } else { (r + 1) * per };
        bounds.push((lo, hi));
    }
    bounds
}

fn collect_slice_stats(snr_grid: &[[f32; 8]; CHANNEL_SYMBOLS_COUNT], cfg: &Config) -> Vec<SliceStats> {
    let bounds = slice_bounds(cfg);
    let mut stats = Vec::with_capacity(bounds.len());
    for (lo, hi) in bounds {
        let mut bests = Vec::new();
        let mut noises = Vec::new();
        for si in lo..hi {
            let row = &snr_grid[si];
            if let Some(tone) = costas_tone_at(si) {
                bests.push(row[tone as usize] as f64);
                for (t, &mag) in row.iter().enumerate() {
                    if t as u8 != tone {
                        noises.push(mag as f64);
                    }
                }
            } else {
                let mut sorted = *row;
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
                bests.push(sorted[7] as f64);
                noises.extend(sorted[..7].iter().map(|&v| v as f64));
            }
        }
        if cfg.best_in_noise {
            noises.extend(bests.iter().copied());
        }
        stats.push(SliceStats {
            bests: Distribution::new(bests),
            noises: Distribution::new(noises),
        });
    }
    stats
}

fn slice_for_symbol(si: usize, cfg: &Config) -> usize {
    let bounds = slice_bounds(cfg);
    bounds
        .iter()
        .position(|&(lo, hi)| si >= lo && si < hi)
        .unwrap_or(bounds.len() - 1)
}

/// Soft-demodulate a 200 sps candidate at offset `off` into 174 clamped
/// LLRs, MSB-first per symbol (§3, §4.E).
pub fn demodulate(samples200: &[f32], off: i64, cfg: &Config) -> [f32; crate::constants::CODEWORD_BITS] {
    let grid = tone_magnitudes(samples200, off);
    let snr_grid = convert_to_snr(&grid, cfg);
    let stats = collect_slice_stats(&snr_grid, cfg);

    let mut llrs = [0.0f32; crate::constants::CODEWORD_BITS];
    let mut bit = 0usize;
    for si in 0..CHANNEL_SYMBOLS_COUNT {
        if costas_tone_at(si).is_some() {
            continue;
        }
        let row = &snr_grid[si];
        let slice = slice_for_symbol(si, cfg);
        let best = &stats[slice].bests;
        let noise = &stats[slice].noises;

        for b in 0..3 {
            let (zero_tones, one_tones): (Vec<u8>, Vec<u8>) = (0..8u8).partition(|&t| (tone_to_bits(t) >> (2 - b)) & 1 == 0);
            let best_zero = zero_tones.iter().map(|&t| row[t as usize]).fold(f32::MIN, f32::max);
            let best_one = one_tones.iter().map(|&t| row[t as usize]).fold(f32::MIN, f32::max);

            let (p0, p1) = priors(bit, cfg.use_apriori);
            let f_best_zero = best.problt(best_zero as f64, cfg.problt_how, cfg.log_tail as f64, cfg.log_rate as f64);
            let f_best_one = best.problt(best_one as f64, cfg.problt_how, cfg.log_tail as f64, cfg.log_rate as f64);
            let f_noise_zero = noise.problt(best_zero as f64, cfg.problt_how, cfg.log_tail as f64, cfg.log_rate as f64);
            let f_noise_one = noise.problt(best_one as f64, cfg.problt_how, cfg.log_tail as f64, cfg.log_rate as f64);

            let a = p0 * f_best_zero * (1.0 - f_noise_one);
            let bb = p1 * f_best_one * (1.0 - f_noise_zero);
            let p = if a + bb > 0.0 { a / (a + bb) } else { 0.5 };
            let ll = ((p / (1.0 - p)).ln() as f32).clamp(-cfg.llr_clamp, cfg.llr_clamp);
            llrs[bit] = ll;
            bit += 1;
        }
    }

    llrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth_symbol_buffer(tones: &[u8; CHANNEL_SYMBOLS_COUNT]) -> Vec<f32> {
        let mut out = vec![0.0f32; CHANNEL_SYMBOLS_COUNT * SYM_LEN];
        for (si, &tone) in tones.iter().enumerate() {
            let freq = 25.0 + tone as f32 * 6.25;
            let dphi = 2.0 * std::f32::consts::PI * freq / 200.0;
            let mut phase = 0.0f32;
            for k in 0..SYM_LEN {
                out[si * SYM_LEN + k] = phase.sin();
                phase += dphi;
            }
        }
        out
    }

    #[test]
    fn demodulate_yields_174_finite_clamped_llrs() {
        let mut tones = [0u8; CHANNEL_SYMBOLS_COUNT];
        for (si, t) in tones.iter_mut().enumerate() {
            *t = (si % 8) as u8;
        }
        for &start in &COSTAS_STARTS {
            for (s, &tone) in COSTAS.iter().enumerate() {
                tones[start + s] = tone;
            }
        }
        let buf = synth_symbol_buffer(&tones);
        let cfg = Config::default();
        let llrs = demodulate(&buf, 0, &cfg);
        for &l in &llrs {
            assert!(l.is_finite());
            assert!(l.abs() <= cfg.llr_clamp + 1e-6);
        }
    }
}
