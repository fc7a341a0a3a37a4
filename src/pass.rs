//! Pass controller: sub-band partitioning, per-sub-band worker threads,
//! multi-pass candidate pipeline, dedup, and the reported SNR estimate
//! (§4.I, §5).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, instrument};

use crate::coarse::coarse_search;
use crate::config::Config;
use crate::constants::{block_len, CHANNEL_SYMBOLS_COUNT, CODEWORD_BITS};
use crate::crc::check_crc;
use crate::demod::demodulate;
use crate::fine::{search_both, search_both_known, search_drift};
use crate::ldpc::decode as ldpc_decode;
use crate::resample::{choose_rate, reduce_rate};
use crate::subtract::subtract;
use crate::symbol::encode_symbols;

/// "Nice" FFT sizes (products of small primes) a window length is
/// trimmed to when within 5%, so FFT plans stay cheap and cacheable.
const NICE_SIZES: &[usize] = &[
    1024, 1536, 2048, 3072, 4096, 6144, 8192, 12288, 16384, 24576, 32768, 49152, 65536, 98304, 131072,
];

fn trim_to_nice(len: usize) -> usize {
    for &nice in NICE_SIZES {
        let diff = (len as f32 - nice as f32).abs() / len as f32;
        if diff < 0.05 {
            return nice;
        }
    }
    len
}

/// A decoded message, as delivered to the caller's callback.
pub struct Decode {
    pub bits87: [bool; 87],
    pub hz0: f32,
    pub hz1: f32,
    pub off_sec: f32,
    pub comment: String,
    pub snr: f32,
}

/// Callback return code: 0 uninterested, 1 acknowledged (not new), 2 new
/// (triggers subtraction).
pub type Callback = dyn Fn(&Decode) -> u8 + Send + Sync;

struct SubBand {
    lo_hz: f32,
    hi_hz: f32,
}

fn split_subbands(min_hz: f32, max_hz: f32, nthreads: usize, overlap_hz: f32) -> Vec<SubBand> {
    let n = nthreads.max(1);
    let span = (max_hz - min_hz) / n as f32;
    (0..n)
        .map(|i| {
            let lo = min_hz + i as f32 * span - if i > 0 { overlap_hz } else { 0.0 };
            let hi = min_hz + (i as f32 + 1.0) * span + if i + 1 < n { overlap_hz } else { 0.0 };
            SubBand { lo_hz: lo.max(min_hz), hi_hz: hi.min(max_hz) }
        })
        .collect()
}

/// Randomly-resampled padding (not synthetic silence) so a short window
/// still has plausible spectral content past its natural end (§4.I step 3).
fn pad_with_random_resample(samples: &[f32], target_len: usize) -> Vec<f32> {
    if samples.is_empty() || samples.len() >= target_len {
        return samples.to_vec();
    }
    let mut out = samples.to_vec();
    let mut rng = rand::rng();
    out.resize_with(target_len, || samples[rng.random_range(0..samples.len())]);
    out
}

/// SNR estimate reported to the callback; never used for accept/reject.
fn estimate_snr(samples200: &[f32], off: i64) -> f32 {
    use crate::constants::{COSTAS, COSTAS_STARTS};
    const SYM_LEN: usize = 32;

    let mut signal = 0.0f32;
    let mut noise = 0.0f32;
    for si in 0..CHANNEL_SYMBOLS_COUNT {
        let start = off + (si as i64) * SYM_LEN as i64;
        if start < 0 || (start as usize) + SYM_LEN > samples200.len() {
            continue;
        }
        let mut buf: Vec<rustfft::num_complex::Complex<f32>> = samples200[start as usize..start as usize + SYM_LEN]
            .iter()
            .map(|&x| rustfft::num_complex::Complex::new(x, 0.0))
            .collect();
        crate::fft::fft_forward(&mut buf);
        let mags: Vec<f32> = (0..8).map(|t| buf[4 + t].norm()).collect();

        let costas_tone = COSTAS_STARTS.iter().find(|&&s| si >= s && si < s + 7).map(|&s| COSTAS[si - s]);
        if let Some(tone) = costas_tone {
            signal += mags[tone as usize];
            noise += mags.iter().enumerate().filter(|&(t, _)| t as u8 != tone).map(|(_, &m)| m).sum::<f32>();
        } else {
            let mut sorted = mags.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            signal += sorted[7];
            noise += sorted[2] + sorted[3] + sorted[4];
        }
    }
    let ratio_sq = (signal / noise.max(1e-12)).powi(2);
    1.4 * (10.0 * (ratio_sq - 1.0).max(0.1).log10() / (2500.0 / 2.7) + 5.0)
}

/// Pin payload bits 0..28 (codeword positions 87..115) to `±llr_clamp`
/// per each hint's bits (MSB-first) and retry LDPC until one succeeds
/// (§4.J). A hint's bit 0 means "more likely 0" (positive LLR).
fn try_hints(llrs: &[f32; CODEWORD_BITS], hints1: &[u32], hints2: &[u32], cfg: &Config) -> Option<crate::ldpc::DecodeResult> {
    for &hint in hints1.iter().chain(hints2.iter()) {
        let mut biased = *llrs;
        for i in 0..28 {
            let bit = (hint >> (27 - i)) & 1;
            biased[87 + i] = if bit == 0 { cfg.llr_clamp } else { -cfg.llr_clamp };
        }
        let result = ldpc_decode(&biased, cfg.ldpc_iters);
        if result.checks_satisfied >= cfg.osd_ldpc_thresh && check_crc(&result.message().try_into().unwrap()) {
            return Some(result);
        }
    }
    None
}

struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    fn expired(&self) -> bool {
        self.start.elapsed() >= self.budget
    }
}

struct WorkerState {
    dedup_text: Arc<Mutex<HashSet<String>>>,
    callback_lock: Arc<Mutex<()>>,
}

#[instrument(skip(samples, cfg, on_decode, hints1, hints2), fields(min_hz = sub.lo_hz, max_hz = sub.hi_hz))]
#[allow(clippy::too_many_arguments)]
fn run_subband(
    samples: &[f32],
    rate: u32,
    start: i64,
    sub: &SubBand,
    cfg: &Config,
    hints1: &[u32],
    hints2: &[u32],
    state: &WorkerState,
    on_decode: &Callback,
) {
    let min_hz = sub.lo_hz;
    let max_hz = sub.hi_hz;
    let block = block_len(rate as f32);
    let min_len = (start as usize) + (cfg.tplus * rate as f32) as usize + 80 * block;
    let padded = pad_with_random_resample(samples, min_len);
    let trimmed_len = trim_to_nice(padded.len()).min(padded.len().max(1));
    let nsamples: Vec<f32> = padded[..trimmed_len.min(padded.len())].to_vec();

    let (work_rate, work_samples, delta_hz) = {
        let target = choose_rate(min_hz, max_hz);
        if (target as f32) < rate as f32 {
            let r = reduce_rate(&nsamples, min_hz - 50.0, max_hz + 50.0, rate as f32, target as f32, cfg);
            (target, r.samples, r.delta_hz)
        } else {
            (rate, nsamples.clone(), 0.0)
        }
    };

    let mut nsamples_work = work_samples.clone();
    let start_work = (start as f32 * work_rate as f32 / rate as f32) as i64;

    let total_budget = Duration::from_secs_f32(cfg.budget_seconds / cfg.nthreads as f32);
    let pass_start = Instant::now();

    for pass_i in 0..cfg.npasses {
        // Scoped per-pass: a frequency bucket claimed in an earlier pass
        // must not stay excluded once that pass's subtraction has run.
        let already: Mutex<HashSet<i64>> = Mutex::new(HashSet::new());
        let samples_pass = nsamples_work.clone();
        let remaining = total_budget.saturating_sub(pass_start.elapsed());
        let denom = (cfg.npasses - pass_i).max(1) as f32;
        let mut pass_budget = remaining.mul_f32(1.0 / denom);
        if pass_i == 0 {
            pass_budget = pass_budget.mul_f32(cfg.pass0_frac);
        }
        let deadline = Deadline { start: Instant::now(), budget: pass_budget };
        let is_last_pass = pass_i + 1 == cfg.npasses;
        let mut any_decoded = false;

        let mut candidates = coarse_search(&samples_pass, work_rate, start_work, min_hz - delta_hz, max_hz - delta_hz, cfg);
        candidates.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap());

        for cand in candidates {
            if deadline.expired() {
                let within_final = is_last_pass && deadline.start.elapsed().as_secs_f32() < cfg.final_deadline;
                if !(!any_decoded || within_final) {
                    break;
                }
            }

            let bucket = (cand.hz / cfg.already_hz).round() as i64;
            {
                let mut set = already.lock().unwrap();
                if set.contains(&bucket) {
                    continue;
                }
                set.insert(bucket);
            }

            let reduced200 = reduce_rate(&samples_pass, cand.hz, cand.hz + 50.0, work_rate as f32, 200.0, cfg);
            let down = reduced200.samples;
            let off0 = (cand.offset as f32 * 200.0 / work_rate as f32) as i64;
            let base = search_both(&down, off0, cfg);
            let refined = search_drift(&down, base, cfg);
            if refined.strength <= 0.0 {
                continue;
            }

            let llrs = demodulate(&down, refined.off, cfg);
            let llr_arr: [f32; CODEWORD_BITS] = llrs;
            let first = ldpc_decode(&llr_arr, cfg.ldpc_iters);
            let result = if first.checks_satisfied >= cfg.osd_ldpc_thresh && check_crc(&first.message().try_into().unwrap()) {
                Some(first)
            } else if cfg.use_hints {
                try_hints(&llr_arr, hints1, hints2, cfg)
            } else {
                None
            };
            let Some(result) = result else {
                continue;
            };

            let codeword_u8: [u8; CODEWORD_BITS] = std::array::from_fn(|i| result.bits[i] as u8);
            let symbols = encode_symbols(&codeword_u8);
            let known = search_both_known(&down, refined, &symbols, cfg);

            // `known.hz`/`known.off` live in the 200 sps, 25 Hz-anchored frame
            // produced by `reduce_rate` for this candidate; translate back to
            // the work-rate frame (what `nsamples_work` is sampled at) before
            // reporting or subtracting.
            let tone0_work_hz = cand.hz + (known.hz - 25.0);
            let off_work = (known.off as f32 * work_rate as f32 / 200.0) as i64;

            let hz0 = tone0_work_hz + delta_hz;
            let hz1 = hz0;
            let snr = estimate_snr(&down, known.off);
            let message: [bool; 87] = result.bits[87..174].try_into().unwrap();
            let decode = Decode {
                bits87: message,
                hz0,
                hz1,
                off_sec: known.off as f32 / 200.0,
                comment: String::new(),
                snr,
            };

            let text_key = format!("{:?}", decode.bits87);
            let is_new = {
                let mut set = state.dedup_text.lock().unwrap();
                set.insert(text_key)
            };

            let code = {
                let _guard = state.callback_lock.lock().unwrap();
                on_decode(&decode)
            };

            if code == 2 && is_new {
                any_decoded = true;
                // Only `nsamples_work` is mutated; this pass's own `samples_pass`
                // and candidate list are left alone, per the spec's pass semantics.
                // The next pass resets its working copy from the updated buffer.
                subtract(&mut nsamples_work, work_rate as f32, tone0_work_hz, tone0_work_hz, off_work, &symbols, cfg);
            }
        }
    }
    debug!(min_hz, max_hz, "sub-band pass complete");
}

/// Decode one window, partitioning `[min_hz, max_hz]` across `cfg.nthreads`
/// worker threads (§4.I, §5). `on_decode` is invoked under a single global
/// callback mutex so it observes decodes one at a time. `hints1`/`hints2`
/// are 28-bit partial-codeword hints (§4.J); pass empty slices when none
/// apply.
#[allow(clippy::too_many_arguments)]
pub fn decode_window(
    samples: &[f32],
    rate: u32,
    start: i64,
    min_hz: f32,
    max_hz: f32,
    cfg: &Config,
    hints1: &[u32],
    hints2: &[u32],
    on_decode: Arc<Callback>,
) {
    let subbands = split_subbands(min_hz, max_hz, cfg.nthreads, cfg.overlap_hz);
    let state = Arc::new(WorkerState {
        dedup_text: Arc::new(Mutex::new(HashSet::new())),
        callback_lock: Arc::new(Mutex::new(())),
    });

    std::thread::scope(|scope| {
        for sub in &subbands {
            let cfg = cfg.clone();
            let state = Arc::clone(&state);
            let on_decode = Arc::clone(&on_decode);
            scope.spawn(move || {
                run_subband(samples, rate, start, sub, &cfg, hints1, hints2, &state, on_decode.as_ref());
            });
        }
    });

    info!(subbands = subbands.len(), "window decode complete");
}
