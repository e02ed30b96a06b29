//! Bonferroni family-wise error correction.

/// Bonferroni adjusted p-values: `n * p` clipped at 1, with `n` the number
/// of non-NaN p-values. NaN inputs stay NaN.
pub fn adjust_bonferroni(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.iter().filter(|p| !p.is_nan()).count() as f64;
    p_values
        .iter()
        .map(|&p| if p.is_nan() { p } else { (n * p).min(1.0) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bonferroni() {
        let q = adjust_bonferroni(&[0.01, 0.2, f64::NAN, 0.001]);
        assert_relative_eq!(q[0], 0.03, epsilon = 1e-12);
        assert_eq!(q[1], 1.0);
        assert!(q[2].is_nan());
        assert_relative_eq!(q[3], 0.003, epsilon = 1e-12);
    }

    #[test]
    fn test_bonferroni_empty() {
        assert!(adjust_bonferroni(&[]).is_empty());
    }
}
