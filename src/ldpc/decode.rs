//! Belief-propagation (sum-product) decoder for the rate-½ (174,87) code.

use super::constants::{check_variables, variable_checks, K, M, N};
use crate::crc::check_crc;

/// Piecewise-linear approximation of atanh, tuned the way WSJT-X's
/// `platanh` is: not mathematically exact, but numerically well-behaved
/// for belief propagation, and cheap. Caps output at ±7.0.
#[inline]
fn platanh(x: f32) -> f32 {
    let isign = if x < 0.0 { -1.0 } else { 1.0 };
    let z = x.abs();
    if z <= 0.664 {
        x / 0.83
    } else if z <= 0.9217 {
        isign * (z - 0.4064) / 0.322
    } else if z <= 0.9951 {
        isign * (z - 0.8378) / 0.0524
    } else if z <= 0.9998 {
        isign * (z - 0.9914) / 0.0012
    } else {
        isign * 7.0
    }
}

/// Outcome of a decode attempt.
pub struct DecodeResult {
    pub bits: [bool; N],
    pub checks_satisfied: usize,
    pub iterations: usize,
    pub crc_ok: bool,
}

impl DecodeResult {
    pub fn message(&self) -> &[bool] {
        &self.bits[M..N]
    }
}

/// Run belief propagation for up to `max_iterations`, returning the best
/// hard decision found (full convergence if reached, otherwise whichever
/// iteration satisfied the most checks). Callers apply their own quality
/// gate (`osd_ldpc_thresh`) against `checks_satisfied` before trusting
/// `crc_ok`.
pub fn decode(llr: &[f32; N], max_iterations: usize) -> DecodeResult {
    let var_degree: Vec<usize> = (0..N).map(|n| variable_checks(n).len()).collect();
    let check_degree: Vec<usize> = (0..M).map(|m| check_variables(m).len()).collect();

    // toc[m][i]: message into check m from its i-th variable.
    // tov[n][i]: message into variable n from its i-th check.
    let mut toc: Vec<Vec<f32>> = (0..M).map(|m| vec![0.0f32; check_degree[m]]).collect();
    let mut tov: Vec<Vec<f32>> = (0..N).map(|n| vec![0.0f32; var_degree[n]]).collect();

    for m in 0..M {
        for (i, &n) in check_variables(m).iter().enumerate() {
            toc[m][i] = llr[n];
        }
    }

    let mut best_bits = [false; N];
    let mut best_satisfied = 0usize;
    let mut best_iter = 0usize;

    for iter in 0..=max_iterations {
        let mut zn = [0.0f32; N];
        for n in 0..N {
            zn[n] = llr[n] + tov[n].iter().sum::<f32>();
        }

        let mut bits = [false; N];
        for n in 0..N {
            bits[n] = zn[n] > 0.0;
        }

        let mut satisfied = 0usize;
        for m in 0..M {
            let parity = check_variables(m).iter().fold(false, |acc, &n| acc ^ bits[n]);
            if !parity {
                satisfied += 1;
            }
        }

        if satisfied > best_satisfied {
            best_satisfied = satisfied;
            best_bits = bits;
            best_iter = iter;
        }

        if satisfied == M {
            let message: [bool; K] = best_bits[M..N].try_into().unwrap();
            let crc_ok = check_crc(&message);
            return DecodeResult {
                bits: best_bits,
                checks_satisfied: best_satisfied,
                iterations: iter,
                crc_ok,
            };
        }

        if iter == max_iterations {
            break;
        }

        // variable -> check
        for m in 0..M {
            for (i, &n) in check_variables(m).iter().enumerate() {
                let pos = variable_checks(n).iter().position(|&c| c == m).unwrap();
                toc[m][i] = zn[n] - tov[n][pos];
            }
        }

        // check -> variable
        for n in 0..N {
            for (i, &m) in variable_checks(n).iter().enumerate() {
                let mut product = 1.0f32;
                for (k, &nn) in check_variables(m).iter().enumerate() {
                    if nn != n {
                        product *= (-toc[m][k] / 2.0).tanh();
                    }
                }
                tov[n][i] = 2.0 * platanh(-product);
            }
        }
    }

    let message: [bool; K] = best_bits[M..N].try_into().unwrap();
    let crc_ok = best_satisfied == M && check_crc(&message);
    DecodeResult {
        bits: best_bits,
        checks_satisfied: best_satisfied,
        iterations: best_iter,
        crc_ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldpc::encode;

    #[test]
    fn perfect_codeword_converges_immediately() {
        let mut message = [false; K];
        for i in (0..K).step_by(7) {
            message[i] = true;
        }
        let payload: [bool; 75] = message[..75].try_into().unwrap();
        let block = crate::crc::append_crc(&payload);
        let cw = encode(&block);

        let llr: [f32; N] = std::array::from_fn(|i| if cw[i] { 6.0 } else { -6.0 });
        let result = decode(&llr, 25);
        assert_eq!(result.checks_satisfied, M);
        assert!(result.crc_ok);
        assert_eq!(result.message(), &block[..]);
    }

    #[test]
    fn noisy_codeword_self_corrects() {
        let mut message = [false; K];
        message[3] = true;
        message[40] = true;
        let payload: [bool; 75] = message[..75].try_into().unwrap();
        let block = crate::crc::append_crc(&payload);
        let cw = encode(&block);

        let mut llr: [f32; N] = std::array::from_fn(|i| if cw[i] { 3.0 } else { -3.0 });
        // flip confidence (not the hard bit) on a couple of parity positions
        llr[5] = -0.5;
        llr[60] = 0.5;

        let result = decode(&llr, 25);
        assert!(result.checks_satisfied >= 70);
    }

    #[test]
    fn garbage_llr_does_not_panic_and_reports_low_quality() {
        let llr: [f32; N] = std::array::from_fn(|i| if i % 2 == 0 { 0.2 } else { -0.2 });
        let result = decode(&llr, 10);
        assert!(result.checks_satisfied <= M);
    }
}
