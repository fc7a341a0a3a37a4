//! Fine search: refine frequency/offset on a 200 sps downsampled candidate
//! (§4.D), grounded on the reference's `search_both`/`search_both_known`.

use rustfft::num_complex::Complex;
use tracing::{debug, trace};

use crate::config::Config;
use crate::constants::{CHANNEL_SYMBOLS_COUNT, COSTAS, COSTAS_STARTS};
use crate::fft::fft_forward;
use crate::resample::{hilbert_shift, shift200};

const DOWN_RATE: f32 = 200.0;
const SYM_LEN: usize = 32; // 200 sps / 6.25 Hz tone spacing

/// Result of a fine-search stage: refined center frequency (Hz, on the
/// original buffer's axis, via the 25 Hz anchor), sample offset into the
/// 200 sps buffer, and the winning Costas correlation strength.
#[derive(Debug, Clone, Copy)]
pub struct FineSync {
    pub hz: f32,
    pub off: i64,
    pub strength: f32,
}

fn symbol_fft_mags(samples200: &[f32], start: i64) -> Option<[f32; 8]> {
    if start < 0 || (start as usize) + SYM_LEN > samples200.len() {
        return None;
    }
    let mut buf: Vec<Complex<f32>> = samples200[start as usize..start as usize + SYM_LEN]
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .collect();
    fft_forward(&mut buf);
    // Tone 0 sits at the 25 Hz anchor (bin 4 of a 32-point, 200 sps FFT);
    // tones 0..7 occupy bins 4..11 at 6.25 Hz spacing (§4.E step 1).
    let mut mags = [0.0f32; 8];
    for (t, m) in mags.iter_mut().enumerate() {
        *m = buf[4 + t].norm();
    }
    Some(mags)
}

/// Costas correlation strength at trial offset `off` (samples into the
/// 200 sps buffer) and trial frequency `hz` (re-centered via `shift200`
/// before scoring): expected tone contributes `+|c|`, the other seven
/// contribute `-|c|/7`, summed over the 3×7 Costas symbols.
pub fn one_strength(samples200: &[f32], off: i64, hz: f32) -> f32 {
    let shifted = shift200(samples200, hz);
    let mut total = 0.0f32;
    for &start in &COSTAS_STARTS {
        for (s, &tone) in COSTAS.iter().enumerate() {
            let sym_start = off + ((start + s) as i64) * SYM_LEN as i64;
            let Some(mags) = symbol_fft_mags(&shifted, sym_start) else {
                continue;
            };
            for (t, &mag) in mags.iter().enumerate() {
                if t as u8 == tone {
                    total += mag;
                } else {
                    total -= mag / 7.0;
                }
            }
        }
    }
    total
}

/// Grid search over `hz = 25 ± second_hz_win` and `off ∈ [off0 -
/// second_off_win, off0 + second_off_win]`. Only strictly positive,
/// improving strengths replace the running best.
pub fn search_both(samples200: &[f32], off0: i64, cfg: &Config) -> FineSync {
    let mut best = FineSync { hz: 25.0, off: off0, strength: 0.0 };

    let hz_steps = (cfg.second_hz_win / cfg.second_hz_inc).round() as i64;
    let off_steps = (cfg.second_off_win / cfg.second_off_inc) as i64;

    for hi in -hz_steps..=hz_steps {
        let hz = 25.0 + hi as f32 * cfg.second_hz_inc;
        for oi in -off_steps..=off_steps {
            let off = off0 + oi * cfg.second_off_inc as i64;
            let s = one_strength(samples200, off, hz);
            if s > best.strength {
                best = FineSync { hz, off, strength: s };
                trace!(hz, off, strength = s, "search_both improved");
            }
        }
    }
    debug!(hz = best.hz, off = best.off, strength = best.strength, "search_both result");
    best
}

/// Optional drift search (`use_drift`): try `{0, -drift, +drift}` Hz of
/// linear drift across the transmission and keep whichever maximizes
/// `one_strength` at the already-refined (hz, off). Disabled by default.
pub fn search_drift(samples200: &[f32], base: FineSync, cfg: &Config) -> FineSync {
    if !cfg.use_drift {
        return base;
    }
    let mut best = base;
    for &drift in &[0.0, -cfg.drift_hz, cfg.drift_hz] {
        if drift == 0.0 {
            continue;
        }
        let ramped = hilbert_shift(samples200, -drift / 2.0, drift / 2.0, DOWN_RATE);
        let s = one_strength(&ramped, best.off, best.hz);
        if s > best.strength {
            best = FineSync { hz: best.hz, off: best.off, strength: s };
        }
    }
    best
}

/// Final refine using the decoded 79-symbol sequence: score each trial by
/// correlating the *known* expected tone against the matching FFT bin at
/// every symbol position (not just the 21 Costas positions).
pub fn search_both_known(samples200: &[f32], base: FineSync, known_symbols: &[u8; CHANNEL_SYMBOLS_COUNT], cfg: &Config) -> FineSync {
    let mut best = base;
    let hz_steps = (cfg.third_hz_win / cfg.third_hz_inc).round() as i64;
    let off_steps = (cfg.third_off_win / cfg.third_off_inc) as i64;

    for hi in -hz_steps..=hz_steps {
        let hz = base.hz + hi as f32 * cfg.third_hz_inc;
        for oi in -off_steps..=off_steps {
            let off = base.off + oi * cfg.third_off_inc as i64;
            let shifted = shift200(samples200, hz);
            let mut total = 0.0f32;
            for (si, &tone) in known_symbols.iter().enumerate() {
                let sym_start = off + (si as i64) * SYM_LEN as i64;
                if let Some(mags) = symbol_fft_mags(&shifted, sym_start) {
                    total += mags[tone as usize];
                }
            }
            if total > best.strength {
                best = FineSync { hz, off, strength: total };
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth_costas_buffer() -> Vec<f32> {
        let nsym = CHANNEL_SYMBOLS_COUNT;
        let mut out = vec![0.0f32; nsym * SYM_LEN];
        for si in 0..nsym {
            let tone = COSTAS_STARTS
                .iter()
                .find(|&&s| si >= s && si < s + 7)
                .map(|&s| COSTAS[si - s])
                .unwrap_or(0);
            let freq = 25.0 + tone as f32 * 6.25;
            let dphi = 2.0 * std::f32::consts::PI * freq / DOWN_RATE;
            let mut phase = 0.0f32;
            for k in 0..SYM_LEN {
                out[si * SYM_LEN + k] = phase.sin();
                phase += dphi;
            }
        }
        out
    }

    #[test]
    fn one_strength_is_positive_for_matching_costas_signal() {
        let buf = synth_costas_buffer();
        let s = one_strength(&buf, 0, 25.0);
        assert!(s > 0.0);
    }

    #[test]
    fn search_both_recovers_zero_offset() {
        let buf = synth_costas_buffer();
        let cfg = Config::default();
        let result = search_both(&buf, 0, &cfg);
        assert!(result.strength > 0.0);
        assert!((result.off).abs() <= (cfg.second_off_win as i64) + 1);
    }
}
