//! Benjamini-Hochberg false discovery rate correction.

use std::cmp::Ordering;

/// Benjamini-Hochberg adjusted p-values.
///
/// NaN inputs stay NaN and do not count toward the number of tests. The
/// remaining p-values are walked from largest to smallest (ties broken by
/// descending position); each gets `(n / rank) * p`, the running minimum is
/// carried forward so q-values never increase as p decreases, and the
/// result is clipped at 1.
pub fn adjust_bh(p_values: &[f64]) -> Vec<f64> {
    let mut ordered: Vec<(f64, usize)> = p_values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, p)| !p.is_nan())
        .map(|(i, p)| (p, i))
        .collect();
    ordered.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    ordered.reverse();

    let n = ordered.len();
    let n_f64 = n as f64;
    let mut adjusted: Vec<f64> = ordered
        .iter()
        .enumerate()
        .map(|(i, &(p, _))| {
            let rank = (n - i) as f64;
            (n_f64 / rank) * p
        })
        .collect();
    for i in 1..n {
        if adjusted[i - 1] < adjusted[i] {
            adjusted[i] = adjusted[i - 1];
        }
    }

    let mut q_values = vec![f64::NAN; p_values.len()];
    for (&(_, idx), q) in ordered.iter().zip(adjusted) {
        q_values[idx] = q.min(1.0);
    }
    q_values
}
