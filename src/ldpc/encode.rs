//! Systematic LDPC(174,87) encoder.
//!
//! Codeword layout: bits `0..87` are parity, bits `87..174` are the
//! message verbatim (§3). Parity bit `m` is the XOR of the message bits
//! named by [`super::constants::check_variables`] for check `m`.

use super::constants::{check_variables, K, M, N};

/// Encode an 87-bit message into a 174-bit codeword.
pub fn encode(message: &[bool; K]) -> [bool; N] {
    let mut codeword = [false; N];
    codeword[M..N].copy_from_slice(message);

    for m in 0..M {
        let mut parity = false;
        for &v in check_variables(m) {
            if v >= M {
                parity ^= message[v - M];
            }
        }
        codeword[m] = parity;
    }
    codeword
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_message_gives_all_zero_codeword() {
        let message = [false; K];
        let cw = encode(&message);
        assert!(cw.iter().all(|&b| !b));
    }

    #[test]
    fn message_bits_are_preserved_verbatim() {
        let mut message = [false; K];
        message[0] = true;
        message[50] = true;
        let cw = encode(&message);
        assert_eq!(&cw[M..N], &message[..]);
    }

    #[test]
    fn encoded_codeword_satisfies_every_parity_check() {
        let mut message = [false; K];
        for i in (0..K).step_by(5) {
            message[i] = true;
        }
        let cw = encode(&message);
        for m in 0..M {
            let parity = check_variables(m).iter().fold(false, |acc, &v| acc ^ cw[v]);
            assert!(!parity, "check {m} unsatisfied");
        }
    }
}
