//! Derived-metric arithmetic.
//!
//! Every function is pure. Division by a zero denominator never panics and
//! never yields infinity: [`pct`] and [`ratio`] return `0.0` instead.
//! Callers that must distinguish "no data" from "zero" carry `Option`s and
//! use [`pct_opt`].

use std::collections::BTreeMap;

/// `part / total * 100`, or `0.0` when `total` is zero.
pub fn pct(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        part / total * 100.0
    }
}

/// [`pct`] over optional inputs. Missing input gives a missing result.
pub fn pct_opt(part: Option<f64>, total: Option<f64>) -> Option<f64> {
    Some(pct(part?, total?))
}

/// `numerator / denominator`, or `0.0` when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Absolute change from `before` to `after`.
pub fn delta(before: f64, after: f64) -> f64 {
    after - before
}

/// Relative change from `before` to `after`, in percent.
pub fn pct_change(before: f64, after: f64) -> f64 {
    pct(after - before, before)
}

/// Share of `before` still present in `after`, in percent.
pub fn retention(before: f64, after: f64) -> f64 {
    pct(after, before)
}

/// Share of `before` lost by `after`, in percent.
pub fn pct_loss(before: f64, after: f64) -> f64 {
    pct(before - after, before)
}

/// Rounds half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Sample (n - 1) standard deviation. Returns 0.0 for fewer than two values.
pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    variance.sqrt()
}

/// Sums `value` grouped by `key`. Each row contributes exactly once, so the
/// result does not depend on row order.
pub fn sum_by<'a, T, K, V>(
    rows: impl IntoIterator<Item = &'a T>,
    key: K,
    value: V,
) -> BTreeMap<String, u64>
where
    T: 'a,
    K: Fn(&T) -> Option<&str>,
    V: Fn(&T) -> u64,
{
    let mut totals = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            *totals.entry(k.to_string()).or_insert(0) += value(row);
        }
    }
    totals
}

/// Mean of `value` grouped by `key`, in key order.
pub fn mean_by<'a, T, G, K, V>(
    rows: impl IntoIterator<Item = &'a T>,
    key: K,
    value: V,
) -> BTreeMap<G, f64>
where
    T: 'a,
    G: Ord,
    K: Fn(&T) -> G,
    V: Fn(&T) -> f64,
{
    let mut groups: BTreeMap<G, Vec<f64>> = BTreeMap::new();
    for row in rows {
        groups.entry(key(row)).or_default().push(value(row));
    }
    groups.into_iter().map(|(k, v)| (k, mean(&v))).collect()
}
