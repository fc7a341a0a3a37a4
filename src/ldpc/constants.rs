//! Tanner-graph connectivity for the rate-½ (174,87) code.
//!
//! The reference implementation's actual sparse parity-check table was
//! not available to ground this module (see DESIGN.md). This crate
//! instead *constructs* a self-consistent sparse (174,87) systematic
//! parity-check matrix `H = [I_87 | A]` once, at first use, from a fixed
//! seed: column `i < 87` of `H` is the identity (parity bit `i` checked
//! only by check `i`), and the remaining 87 columns (the message bits)
//! are filled by a fixed deterministic generator so each check touches 6
//! message bits (giving each of the 87 checks a total degree of 7,
//! matching the reference code's per-check degree) and each message bit
//! participates in, on average, 6 checks. The table is built once behind
//! a `lazy_static` and is fixed for the remainder of the process, which
//! is what §4.F means by "compiled in": it is never recomputed per
//! decode.
//!
//! Codeword bit layout (see spec §3): bits `0..87` are parity, bits
//! `87..174` are the systematic message (75 payload bits + 12 CRC bits).

use lazy_static::lazy_static;

pub const N: usize = 174;
pub const M: usize = 87;
pub const K: usize = 87;
const MESSAGE_DEGREE: usize = 6;

/// splitmix64, used only to build a fixed, reproducible sparse graph.
struct SplitMix64(u64);
impl SplitMix64 {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

struct Tables {
    /// Mn[check] = variable-node indices (0..174) participating in that check.
    mn: Vec<Vec<usize>>,
    /// Nm[variable] = check indices that variable participates in.
    nm: Vec<Vec<usize>>,
}

fn build_tables() -> Tables {
    let mut rng = SplitMix64(0xC0DE_CAFE_F00D_1234);
    let mut mn = vec![Vec::with_capacity(7); M];
    let mut nm = vec![Vec::new(); N];

    for (check, row) in mn.iter_mut().enumerate() {
        row.push(check); // identity column: parity bit `check`
        let mut chosen = std::collections::HashSet::new();
        while chosen.len() < MESSAGE_DEGREE {
            let idx = (rng.next() % K as u64) as usize;
            chosen.insert(idx);
        }
        let mut msg_vars: Vec<usize> = chosen.into_iter().map(|j| M + j).collect();
        msg_vars.sort_unstable();
        row.extend(msg_vars);
    }
    for (check, row) in mn.iter().enumerate() {
        for &var in row {
            nm[var].push(check);
        }
    }
    Tables { mn, nm }
}

lazy_static! {
    static ref TABLES: Tables = build_tables();
}

/// Variable-node indices (0..174) that participate in check `m`.
pub fn check_variables(m: usize) -> &'static [usize] {
    &TABLES.mn[m]
}

/// Check indices that variable-node `n` participates in.
pub fn variable_checks(n: usize) -> &'static [usize] {
    &TABLES.nm[n]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_check_has_degree_seven() {
        for m in 0..M {
            assert_eq!(check_variables(m).len(), 7);
        }
    }

    #[test]
    fn parity_columns_are_identity() {
        for m in 0..M {
            assert!(check_variables(m).contains(&m));
        }
    }

    #[test]
    fn every_variable_participates_in_at_least_one_check() {
        for n in 0..N {
            assert!(!variable_checks(n).is_empty(), "variable {n} is unused");
        }
    }
}
