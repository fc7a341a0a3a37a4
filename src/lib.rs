//! JS8 decoder core: coarse/fine signal search, soft demodulation, LDPC
//! decoding, CRC verification, and iterative subtraction of decoded
//! signals, over a multi-threaded sub-band pass pipeline (§1, §2).
//!
//! The crate's single external entry point is [`decode`]; everything
//! else is exposed for testing and for callers who want to drive the
//! pipeline stage-by-stage.

pub mod apriori;
pub mod coarse;
pub mod config;
pub mod constants;
pub mod crc;
pub mod demod;
pub mod distribution;
pub mod error;
pub mod fft;
pub mod fine;
pub mod ldpc;
pub mod pass;
pub mod resample;
pub mod subtract;
pub mod symbol;
pub mod tracing_init;

use std::sync::Arc;

pub use config::Config;
pub use error::{DecodeError, Result};
pub use pass::{Callback, Decode};

/// Decode one window of audio.
///
/// `samples` is the window's sample buffer at `rate` sps (one of
/// [`config::SUPPORTED_RATES`]); `start` is the sample index corresponding
/// to 0.5 s into the 15-second cycle (§4.J). `min_hz`/`max_hz` bound the
/// search band (typically 300–2950 Hz). `hints1`/`hints2` are 28-bit
/// partial-codeword hints used for a second, biased LDPC attempt when
/// `cfg.use_hints` is set (§4.J); pass empty slices when none apply.
///
/// `callback` is invoked once per accepted decode, serialized across all
/// sub-band workers, and returns 0 (uninterested), 1 (acknowledged), or 2
/// (new — triggers subtraction and a chance for weaker overlapping
/// signals to surface on a later pass).
pub fn decode(
    samples: &[f32],
    start: i64,
    rate: u32,
    min_hz: f32,
    max_hz: f32,
    hints1: &[u32],
    hints2: &[u32],
    cfg: &Config,
    callback: impl Fn(&Decode) -> u8 + Send + Sync + 'static,
) -> Result<()> {
    cfg.validate_range(min_hz, max_hz, rate as f32)?;
    if samples.is_empty() {
        return Err(DecodeError::WindowTooShort { actual: 0, minimum: 1 });
    }

    let callback: Arc<Callback> = Arc::new(callback);
    pass::decode_window(samples, rate, start, min_hz, max_hz, cfg, hints1, hints2, callback);
    Ok(())
}
