use std::collections::BTreeMap;

pub fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

pub fn compute_mad(values: &[f64], med: f64) -> f64 {
    let diffs: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(diffs)
}

pub fn compute_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (`n - 1` denominator).
pub fn compute_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = compute_mean(values);
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Natural-log entropy of a count distribution. Never `-0.0`.
pub fn shannon_entropy_from_counts<K>(counts: &BTreeMap<K, usize>) -> f64 {
    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .values()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = *c as f64 / total;
            -p * p.ln()
        })
        .sum::<f64>()
        + 0.0
}

pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(Vec::new()), 0.0);
    }

    #[test]
    fn mad_ignores_single_outlier() {
        let values = [1.0, 1.0, 2.0, 2.0, 1000.0];
        let med = median(values.to_vec());
        assert_eq!(med, 2.0);
        assert_eq!(compute_mad(&values, med), 1.0);
    }

    #[test]
    fn entropy_of_uniform_counts_is_ln_k() {
        let mut counts = BTreeMap::new();
        counts.insert("a", 4usize);
        counts.insert("b", 4);
        counts.insert("c", 4);
        assert!((shannon_entropy_from_counts(&counts) - 3f64.ln()).abs() < 1e-12);
        let mut single = BTreeMap::new();
        single.insert("a", 9usize);
        let h = shannon_entropy_from_counts(&single);
        assert_eq!(h, 0.0);
        assert!(h.is_sign_positive(), "h={h}");
        assert_eq!(h.to_string(), "0");
    }

    #[test]
    fn spread_measures_agree_on_constant_input() {
        let values = [2.0; 4];
        assert_eq!(variance(&values), 0.0);
        assert_eq!(compute_std(&values, compute_mean(&values)), 0.0);
    }
}
