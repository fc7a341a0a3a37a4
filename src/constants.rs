//! Fixed JS8 protocol constants: tone geometry, Costas pattern, codeword
//! layout. Sample rate is *not* fixed here — it is the caller's chosen
//! internal rate from [`crate::config::SUPPORTED_RATES`].

/// Tones per symbol (FSK-8).
pub const TONE_COUNT: usize = 8;

/// Tone spacing in Hz.
pub const TONE_SPACING: f32 = 6.25;

/// Symbols per transmission.
pub const CHANNEL_SYMBOLS_COUNT: usize = 79;

/// Data (non-Costas) symbols per transmission: 79 - 3*7.
pub const DATA_SYMBOLS_COUNT: usize = 58;

/// Bits per data symbol.
pub const BITS_PER_SYMBOL: usize = 3;

/// Codeword length (data bits): 58 * 3.
pub const CODEWORD_BITS: usize = DATA_SYMBOLS_COUNT * BITS_PER_SYMBOL;

/// Costas 7-tone sync pattern, at symbol offsets 0, 36, 72.
///
/// Unlike FT8's `{3,1,4,0,6,5,2}`, JS8 uses `{4,2,5,6,1,3,0}`.
pub const COSTAS: [u8; 7] = [4, 2, 5, 6, 1, 3, 0];

/// Symbol indices at which a Costas array starts.
pub const COSTAS_STARTS: [usize; 3] = [0, 36, 72];

/// Samples per symbol at the reference 12000 sps rate (matches the
/// reference implementation's `NSPS`); at an arbitrary internal rate `r`
/// the block length is `r * REF_NSPS / REF_RATE`.
pub const REF_NSPS: usize = 1920;
pub const REF_RATE: f32 = 12000.0;

/// Symbol period in samples at internal rate `rate`.
pub fn block_len(rate: f32) -> usize {
    ((rate * REF_NSPS as f32) / REF_RATE).round() as usize
}

/// True if `si` (0..79) is part of a Costas sync array.
pub fn is_costas_symbol(si: usize) -> bool {
    COSTAS_STARTS.iter().any(|&s| si >= s && si < s + 7)
}

/// Data-symbol index (0..58) for a full symbol index (0..79), or `None`
/// if `si` is a Costas symbol.
pub fn data_symbol_index(si: usize) -> Option<usize> {
    if si < 7 {
        None
    } else if si < 36 {
        Some(si - 7)
    } else if si < 43 {
        None
    } else if si < 72 {
        Some(si - 14)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_symbol_count_matches() {
        let n = (0..CHANNEL_SYMBOLS_COUNT)
            .filter(|&si| data_symbol_index(si).is_some())
            .count();
        assert_eq!(n, DATA_SYMBOLS_COUNT);
    }

    #[test]
    fn costas_is_exactly_21_symbols() {
        let n = (0..CHANNEL_SYMBOLS_COUNT)
            .filter(|&si| is_costas_symbol(si))
            .count();
        assert_eq!(n, 21);
    }

    #[test]
    fn block_len_matches_reference_at_12k() {
        assert_eq!(block_len(12000.0), 1920);
        assert_eq!(block_len(6000.0), 960);
    }
}
