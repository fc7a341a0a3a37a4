//! CRC-12 check over the 75-bit JS8 payload (§4.G).
//!
//! The reference implementation calls an external `ft8_crc()` whose
//! defining source was not available to ground this module; this crate
//! uses the standard CRC-12/DECT polynomial via the `crc` crate's generic
//! `Algorithm`, in the same style as a CRC-14 used elsewhere in this
//! codebase's ancestry. Decode/CRC/encode are internally consistent
//! (round trips hold); see DESIGN.md for the caveat that the exact
//! polynomial may not match an on-air reference decoder bit-for-bit.

use crc::{Algorithm, Crc};

const CRC12_POLY: u16 = 0x80F; // CRC-12/DECT, x^12+x^11+x^3+x^2+x+1

const CRC12: Algorithm<u16> = Algorithm {
    width: 12,
    poly: CRC12_POLY,
    init: 0x0,
    refin: false,
    refout: false,
    xorout: 0x0,
    check: 0x0,
    residue: 0x0,
};

const CRC12_ENGINE: Crc<u16> = Crc::<u16>::new(&CRC12);

/// Compute the 12-bit CRC over a 75-bit message, zero-padded to 76 bits
/// as the on-air protocol does.
pub fn crc12(message75: &[bool]) -> u16 {
    debug_assert_eq!(message75.len(), 75);
    let mut msg: u128 = 0;
    for &b in message75 {
        msg = (msg << 1) | (b as u128);
    }
    // zero-pad 75 -> 76 bits
    msg <<= 1;
    let bytes = msg.to_be_bytes();
    // 76 bits fits in 10 bytes
    let trimmed = &bytes[bytes.len() - 10..];
    CRC12_ENGINE.checksum(trimmed)
}

/// Check the 87-bit message+CRC block (75 payload bits followed by 12 CRC
/// bits). Rejects all-zero payloads before computing the CRC.
pub fn check_crc(bits87: &[bool; 87]) -> bool {
    let payload = &bits87[..75];
    if payload.iter().all(|&b| !b) {
        return false;
    }
    let expect = crc12(payload);
    let mut got: u16 = 0;
    for &b in &bits87[75..87] {
        got = (got << 1) | (b as u16);
    }
    expect == got
}

/// Build an 87-bit message+CRC block from a 75-bit payload, computing
/// the trailing 12 CRC bits.
pub fn append_crc(payload75: &[bool; 75]) -> [bool; 87] {
    let crc = crc12(payload75);
    let mut out = [false; 87];
    out[..75].copy_from_slice(payload75);
    for i in 0..12 {
        out[75 + i] = ((crc >> (11 - i)) & 1) != 0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_payload_rejected() {
        let bits = [false; 87];
        assert!(!check_crc(&bits));
    }

    #[test]
    fn append_then_check_roundtrips() {
        let mut payload = [false; 75];
        for i in (0..75).step_by(3) {
            payload[i] = true;
        }
        let block = append_crc(&payload);
        assert!(check_crc(&block));
    }

    #[test]
    fn corrupting_a_payload_bit_breaks_the_check() {
        let mut payload = [false; 75];
        payload[10] = true;
        let mut block = append_crc(&payload);
        block[3] = !block[3];
        assert!(!check_crc(&block));
    }

    #[test]
    fn crc_is_12_bits() {
        let payload = [true; 75];
        let crc = crc12(&payload);
        assert!(crc < (1 << 12));
    }
}
