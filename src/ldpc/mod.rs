//! LDPC(174,87) encode/decode for the rate-½ code (§3, §4.F, §4.G).

pub mod constants;
mod decode;
mod encode;

pub use constants::{K, M, N};
pub use decode::{decode, DecodeResult};
pub use encode::encode;
