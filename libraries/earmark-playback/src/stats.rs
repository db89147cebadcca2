//! Binomial significance for listening-test results
//!
//! Coefficients are accumulated in the log domain so long sessions do not
//! overflow.

/// Threshold below which a result is reported as significant
pub const SIGNIFICANCE: f64 = 0.05;

/// ln C(n, k)
fn ln_choose(n: u64, k: u64) -> f64 {
    let k = k.min(n - k);
    (1..=k)
        .map(|j| ((n - k + j) as f64).ln() - (j as f64).ln())
        .sum()
}

/// Probability of at least `k` successes in `n` fair coin flips
///
/// One-sided test, for A/B/X and X/X/Y where only scoring above chance
/// means anything. Returns 1.0 for `k == 0` and 0.0 for `k > n`.
pub fn p_single(k: u64, n: u64) -> f64 {
    if k > n {
        return 0.0;
    }
    if k == 0 {
        return 1.0;
    }
    let ln_half_n = n as f64 * 0.5f64.ln();
    let mut ln_c = ln_choose(n, k);
    let mut total = 0.0;
    for i in k..=n {
        total += (ln_c + ln_half_n).exp();
        if i < n {
            // C(n, i+1) = C(n, i) * (n - i) / (i + 1)
            ln_c += ((n - i) as f64).ln() - ((i + 1) as f64).ln();
        }
    }
    total.min(1.0)
}

/// Two-sided probability of a split at least as lopsided as `k` of `n`
///
/// Used for A/B preference, where either sample winning is a result. The
/// single tail is doubled and capped at 1.0, so an exact even split gives 1.0.
pub fn p_dual(k: u64, n: u64) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let k = k.min(n);
    let extreme = k.max(n - k);
    (2.0 * p_single(extreme, n)).min(1.0)
}

/// Whether `p` is below [`SIGNIFICANCE`]
pub fn is_significant(p: f64) -> bool {
    p < SIGNIFICANCE
}
