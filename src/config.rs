//! Decoder tunables.
//!
//! The reference implementation exposes on the order of 60 process-wide
//! mutable globals, read by name through a string-keyed `set()` call. This
//! crate collects them into one immutable [`Config`], built once per
//! `decode()` call and shared (by reference) across all sub-band workers.
//! [`Config::set`] keeps a compatibility shim over the legacy string-keyed
//! interface for callers migrating off of it.

use crate::error::{DecodeError, Result};

/// Window function used by the FFT cache (§4.A) and the resampler's taper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Hamming,
    Blackman,
    SymmetricBlackman,
    BlackmanHarris,
}

/// Selector for the soft demodulator's per-symbol noise estimate (§4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnrHow {
    Median,
    Mean,
    MeanWeakest7,
    Weakest,
    Strongest,
    SecondStrongest,
}

/// Selector for the `problt` statistical kernel (§4.E, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbltHow {
    Gaussian,
    Empirical,
    LogisticTails,
    GaussianTails,
    GaussianOutside,
}

/// Internal decode sample rates the resampler is allowed to choose between.
pub const SUPPORTED_RATES: [u32; 6] = [1000, 1500, 2000, 3000, 4000, 6000];

/// Fraction of Nyquist kept usable by the resampler's rate choice.
pub const NYQUIST_FRACTION: f32 = 0.925;

#[derive(Debug, Clone)]
pub struct Config {
    // --- §4.A FFT cache & windows ---
    pub window: WindowKind,

    // --- §4.B resampler ---
    pub reduce_extra: f32,
    pub reduce_shoulder: f32,
    pub reduce_factor: f32,
    pub reduce_how: u8,

    // --- §4.C coarse search ---
    pub tminus: f32,
    pub tplus: f32,
    pub ncoarse: usize,
    pub ncoarse_blocks: usize,
    pub coarse_hz_fracs: usize,
    pub coarse_off_fracs: usize,

    // --- §4.D fine search ---
    pub second_hz_win: f32,
    pub second_hz_inc: f32,
    pub second_off_win: i32,
    pub second_off_inc: i32,
    pub use_drift: bool,
    pub drift_hz: f32,
    pub third_hz_win: f32,
    pub third_hz_inc: f32,
    pub third_off_win: i32,
    pub third_off_inc: i32,

    // --- §4.E soft demodulator ---
    pub snr_how: SnrHow,
    pub snr_win: usize,
    pub soft_ranges: usize,
    pub best_in_noise: bool,
    pub use_apriori: bool,
    pub problt_how: ProbltHow,
    pub log_tail: f32,
    pub log_rate: f32,
    pub llr_clamp: f32,

    // --- §4.F LDPC ---
    pub ldpc_iters: usize,
    pub osd_ldpc_thresh: usize,

    // --- §4.H subtractor ---
    pub fancy_subtract: bool,
    pub sub_amp_win: i32,
    pub sub_phase_win: i32,

    // --- §4.I pass controller ---
    pub nthreads: usize,
    pub overlap_hz: f32,
    pub npasses: usize,
    pub pass0_frac: f32,
    pub final_deadline: f32,
    pub already_hz: f32,
    pub budget_seconds: f32,

    // --- §4.J external interface ---
    pub use_hints: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window: WindowKind::SymmetricBlackman,

            reduce_extra: 0.0,
            reduce_shoulder: 0.0,
            reduce_factor: 0.6,
            reduce_how: 2,

            tminus: 2.5,
            tplus: 1.0,
            ncoarse: 50,
            ncoarse_blocks: 4,
            coarse_hz_fracs: 4,
            coarse_off_fracs: 4,

            second_hz_win: 3.5,
            second_hz_inc: 0.5,
            second_off_win: 8,
            second_off_inc: 1,
            use_drift: false,
            drift_hz: 2.0,
            third_hz_win: 1.0,
            third_hz_inc: 0.1,
            third_off_win: 2,
            third_off_inc: 1,

            snr_how: SnrHow::Median,
            snr_win: 7,
            soft_ranges: 1,
            best_in_noise: false,
            use_apriori: false,
            problt_how: ProbltHow::LogisticTails,
            log_tail: 0.10,
            log_rate: 8.0,
            llr_clamp: 4.97,

            ldpc_iters: 25,
            osd_ldpc_thresh: 70,

            fancy_subtract: false,
            sub_amp_win: 1,
            sub_phase_win: 0,

            nthreads: 4,
            overlap_hz: 40.0,
            npasses: 3,
            pass0_frac: 0.4,
            final_deadline: 0.25,
            already_hz: 5.0,
            budget_seconds: 10.0,

            use_hints: false,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder(Config::default())
    }

    /// Validate frequency bounds for a given internal sample rate.
    pub fn validate_range(&self, min_hz: f32, max_hz: f32, rate: f32) -> Result<()> {
        if !(min_hz < max_hz) || max_hz + 50.0 > rate / 2.0 {
            return Err(DecodeError::InvalidRange { min_hz, max_hz });
        }
        Ok(())
    }

    /// Legacy string-keyed compatibility setter; mirrors the reference
    /// implementation's `set(name, value)` registry. Returns the new value
    /// as a string, or the current value unchanged if `value` is empty.
    pub fn set(&mut self, name: &str, value: &str) -> String {
        macro_rules! numeric {
            ($field:ident) => {{
                if !value.is_empty() {
                    if let Ok(v) = value.parse::<f64>() {
                        self.$field = v as _;
                    }
                }
                self.$field.to_string()
            }};
        }
        macro_rules! boolean {
            ($field:ident) => {{
                if !value.is_empty() {
                    self.$field = value != "0" && !value.eq_ignore_ascii_case("false");
                }
                self.$field.to_string()
            }};
        }
        match name {
            "reduce_extra" => numeric!(reduce_extra),
            "reduce_shoulder" => numeric!(reduce_shoulder),
            "reduce_factor" => numeric!(reduce_factor),
            "reduce_how" => numeric!(reduce_how),
            "tminus" => numeric!(tminus),
            "tplus" => numeric!(tplus),
            "ncoarse" => numeric!(ncoarse),
            "ncoarse_blocks" => numeric!(ncoarse_blocks),
            "coarse_hz_fracs" => numeric!(coarse_hz_fracs),
            "coarse_off_fracs" => numeric!(coarse_off_fracs),
            "second_hz_win" => numeric!(second_hz_win),
            "second_hz_inc" => numeric!(second_hz_inc),
            "third_hz_win" => numeric!(third_hz_win),
            "third_hz_inc" => numeric!(third_hz_inc),
            "use_drift" => boolean!(use_drift),
            "drift_hz" => numeric!(drift_hz),
            "snr_win" => numeric!(snr_win),
            "soft_ranges" => numeric!(soft_ranges),
            "best_in_noise" => boolean!(best_in_noise),
            "use_apriori" => boolean!(use_apriori),
            "log_tail" => numeric!(log_tail),
            "log_rate" => numeric!(log_rate),
            "ldpc_iters" => numeric!(ldpc_iters),
            "osd_ldpc_thresh" => numeric!(osd_ldpc_thresh),
            "fancy_subtract" => boolean!(fancy_subtract),
            "sub_amp_win" => numeric!(sub_amp_win),
            "sub_phase_win" => numeric!(sub_phase_win),
            "nthreads" => numeric!(nthreads),
            "overlap_hz" => numeric!(overlap_hz),
            "npasses" => numeric!(npasses),
            "pass0_frac" => numeric!(pass0_frac),
            "final_deadline" => numeric!(final_deadline),
            "already_hz" => numeric!(already_hz),
            "budget_seconds" => numeric!(budget_seconds),
            "use_hints" => boolean!(use_hints),
            _ => String::new(),
        }
    }
}

/// Named-setter builder, replacing the reference implementation's global
/// mutables per §9.
pub struct ConfigBuilder(Config);

impl ConfigBuilder {
    pub fn window(mut self, w: WindowKind) -> Self {
        self.0.window = w;
        self
    }
    pub fn nthreads(mut self, n: usize) -> Self {
        self.0.nthreads = n.max(1);
        self
    }
    pub fn npasses(mut self, n: usize) -> Self {
        self.0.npasses = n.max(1);
        self
    }
    pub fn budget_seconds(mut self, b: f32) -> Self {
        self.0.budget_seconds = b;
        self
    }
    pub fn fancy_subtract(mut self, on: bool) -> Self {
        self.0.fancy_subtract = on;
        self
    }
    pub fn use_apriori(mut self, on: bool) -> Self {
        self.0.use_apriori = on;
        self
    }
    pub fn use_hints(mut self, on: bool) -> Self {
        self.0.use_hints = on;
        self
    }
    pub fn problt_how(mut self, how: ProbltHow) -> Self {
        self.0.problt_how = how;
        self
    }

    pub fn build(self) -> Result<Config> {
        if self.0.nthreads == 0 || self.0.npasses == 0 {
            return Err(DecodeError::InvalidRange {
                min_hz: 0.0,
                max_hz: 0.0,
            });
        }
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_constants() {
        let c = Config::default();
        assert_eq!(c.ldpc_iters, 25);
        assert_eq!(c.osd_ldpc_thresh, 70);
        assert_eq!(c.sub_amp_win, 1);
        assert_eq!(c.sub_phase_win, 0);
        assert!(!c.fancy_subtract);
    }

    #[test]
    fn set_roundtrips_numeric_field() {
        let mut c = Config::default();
        let v = c.set("ldpc_iters", "30");
        assert_eq!(v, "30");
        assert_eq!(c.ldpc_iters, 30);
        // empty value reads back without changing
        let v2 = c.set("ldpc_iters", "");
        assert_eq!(v2, "30");
    }

    #[test]
    fn validate_range_rejects_over_nyquist() {
        let c = Config::default();
        assert!(c.validate_range(300.0, 2950.0, 6000.0).is_err());
        assert!(c.validate_range(300.0, 2950.0, 8000.0).is_ok());
    }
}
