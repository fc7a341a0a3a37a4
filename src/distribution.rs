//! Empirical sample distribution and the 5-mode `problt` kernel (§4.E,
//! §9), grounded on the reference's `Stats` class.

use crate::config::ProbltHow;

/// A finalized (sorted) sample distribution with cached mean/stddev.
pub struct Distribution {
    sorted: Vec<f64>,
    mean: f64,
    stddev: f64,
}

impl Distribution {
    /// Build a distribution from unsorted samples. Sorts once up front;
    /// unlike the reference's lazily-finalized `Stats`, this type is
    /// always ready to query.
    pub fn new(mut samples: Vec<f64>) -> Self {
        let n = samples.len().max(1) as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
        Distribution {
            sorted: samples,
            mean,
            stddev: var.sqrt(),
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn stddev(&self) -> f64 {
        self.stddev
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    fn gaussian_problt(&self, x: f64) -> f64 {
        let sd = if self.stddev > 0.0 {
            (x - self.mean) / self.stddev
        } else {
            0.0
        };
        0.5 * (1.0 + libm::erf(sd / std::f64::consts::SQRT_2))
    }

    /// Index of the first sample >= x (lower_bound equivalent).
    fn lower_bound(&self, x: f64) -> usize {
        self.sorted.partition_point(|&v| v < x)
    }

    /// Fraction of the distribution less than `x`, per the selected
    /// kernel. `log_tail`/`log_rate` only matter for the tail-blending
    /// modes.
    pub fn problt(&self, x: f64, how: ProbltHow, log_tail: f64, log_rate: f64) -> f64 {
        if how == ProbltHow::Gaussian {
            return self.gaussian_problt(x);
        }

        let n = self.sorted.len();
        if n == 0 {
            return 0.5;
        }
        let i = self.lower_bound(x);
        let nf = n as f64;

        match how {
            ProbltHow::Gaussian => unreachable!(),
            ProbltHow::Empirical => i as f64 / nf,
            ProbltHow::LogisticTails => {
                let lo_cut = (log_tail * nf) as usize;
                let hi_cut = ((1.0 - log_tail) * nf) as usize;
                if i < lo_cut {
                    let x0 = self.sorted[lo_cut.min(n - 1)];
                    let mut y = 1.0 / (1.0 + (-log_rate * (x - x0)).exp());
                    y *= log_tail;
                    y
                } else if i > hi_cut {
                    let x0 = self.sorted[hi_cut.min(n - 1)];
                    let mut y = 1.0 / (1.0 + (-log_rate * (x - x0)).exp());
                    y -= 0.5;
                    y *= 2.0;
                    y *= log_tail;
                    y += 1.0 - log_tail;
                    y
                } else {
                    i as f64 / nf
                }
            }
            ProbltHow::GaussianTails => {
                let lo_cut = (log_tail * nf) as usize;
                let hi_cut = ((1.0 - log_tail) * nf) as usize;
                if i < lo_cut || i > hi_cut {
                    self.gaussian_problt(x)
                } else {
                    i as f64 / nf
                }
            }
            ProbltHow::GaussianOutside => {
                if x < self.sorted[0] || x > *self.sorted.last().unwrap() {
                    self.gaussian_problt(x)
                } else {
                    i as f64 / nf
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dist() -> Distribution {
        Distribution::new((0..100).map(|i| i as f64).collect())
    }

    #[test]
    fn gaussian_problt_is_half_at_mean() {
        let d = sample_dist();
        let p = d.problt(d.mean(), ProbltHow::Gaussian, 0.1, 10.0);
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empirical_problt_matches_rank() {
        let d = sample_dist();
        let p = d.problt(50.0, ProbltHow::Empirical, 0.1, 10.0);
        assert!((p - 0.5).abs() < 0.02);
    }

    #[test]
    fn problt_is_monotonic_for_empirical() {
        let d = sample_dist();
        let p1 = d.problt(10.0, ProbltHow::Empirical, 0.1, 10.0);
        let p2 = d.problt(90.0, ProbltHow::Empirical, 0.1, 10.0);
        assert!(p2 > p1);
    }

    #[test]
    fn gaussian_outside_matches_empirical_inside_range() {
        let d = sample_dist();
        let inside = d.problt(50.0, ProbltHow::GaussianOutside, 0.1, 10.0);
        let empirical = d.problt(50.0, ProbltHow::Empirical, 0.1, 10.0);
        assert_eq!(inside, empirical);
    }

    #[test]
    fn gaussian_outside_uses_gaussian_beyond_range() {
        let d = sample_dist();
        let far = d.problt(500.0, ProbltHow::GaussianOutside, 0.1, 10.0);
        assert!(far > 0.99);
    }
}
