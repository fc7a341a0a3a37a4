//! Typed errors for the handful of genuinely fallible entry points.
//!
//! Most of the decoder's internal rejection logic (a candidate that fails
//! LDPC, a CRC mismatch, a deadline expiring) is *not* an error: it is
//! ordinary control flow expressed with `Option`. `DecodeError` exists only
//! for malformed calls into the crate and for internal precondition
//! failures at a few fallible seams (buffer sizing, config construction).

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    #[snafu(display("invalid frequency range: min_hz={min_hz} max_hz={max_hz}"))]
    InvalidRange { min_hz: f32, max_hz: f32 },

    #[snafu(display("window too short: {actual} samples, need at least {minimum}"))]
    WindowTooShort { actual: usize, minimum: usize },

    #[snafu(display("buffer size mismatch: expected {expected}, got {actual}"))]
    BufferSize { expected: usize, actual: usize },

    #[snafu(display("sample rate {rate} is not one of the supported internal rates"))]
    UnsupportedRate { rate: u32 },
}

pub type Result<T, E = DecodeError> = core::result::Result<T, E>;
