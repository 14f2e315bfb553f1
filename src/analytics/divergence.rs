//! Two-sample histogram construction and KL divergence.

use crate::models::{BinProbability, Binding, HistogramDivergence};

/// Number of equal-width bins spanning the combined age range.
pub const BIN_COUNT: usize = 10;

/// Added to every bin count before normalising so no probability is zero.
pub const SMOOTHING: f64 = 1e-6;

/// Split rows into ages whose flag `b` is "true" (any case) and all others.
///
/// Rows whose `ageOn` is missing or not a finite number are dropped from both sets.
pub fn split_ages<'a, I>(rows: I) -> (Vec<f64>, Vec<f64>)
where
    I: IntoIterator<Item = &'a Binding>,
{
    let mut ages_true = Vec::new();
    let mut ages_false = Vec::new();

    for row in rows {
        let Some(age) = row
            .get("ageOn")
            .and_then(|v| v.as_deref())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
        else {
            continue;
        };

        let flag = row
            .get("b")
            .and_then(|v| v.as_deref())
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if flag {
            ages_true.push(age);
        } else {
            ages_false.push(age);
        }
    }

    (ages_true, ages_false)
}

/// KL(p ‖ q) = Σ pᵢ ln(pᵢ / qᵢ). Both slices must be the same length.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .filter(|(pi, _)| **pi > 0.0)
        .map(|(pi, qi)| pi * (pi / qi).ln())
        .sum()
}

/// Bin both samples over their combined range and compare them.
///
/// The divergence is of the "true" distribution relative to the "false" one.
/// With no data at all, both distributions are empty and the divergence is `None`.
pub fn histogram_divergence(ages_true: &[f64], ages_false: &[f64]) -> HistogramDivergence {
    let combined = ages_true.iter().chain(ages_false);
    let (min, max) = combined.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });

    if !min.is_finite() || !max.is_finite() {
        return HistogramDivergence::default();
    }

    // A single distinct value still needs a non-zero bin width.
    let (lo, hi) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (hi - lo) / BIN_COUNT as f64;

    let edges: Vec<f64> = (0..=BIN_COUNT).map(|i| lo + width * i as f64).collect();
    let labels: Vec<String> = edges
        .windows(2)
        .map(|w| format!("{:.1}-{:.1}", w[0], w[1]))
        .collect();

    let p = smoothed_pmf(&bin_counts(ages_true, lo, width));
    let q = smoothed_pmf(&bin_counts(ages_false, lo, width));
    let kl = kl_divergence(&p, &q);

    HistogramDivergence {
        distribution_true: to_bins(&labels, &p),
        distribution_false: to_bins(&labels, &q),
        kl_divergence: Some(kl),
    }
}

fn bin_counts(values: &[f64], lo: f64, width: f64) -> [u64; BIN_COUNT] {
    let mut counts = [0u64; BIN_COUNT];
    for &v in values {
        let idx = (((v - lo) / width).floor() as usize).min(BIN_COUNT - 1);
        counts[idx] += 1;
    }
    counts
}

/// Normalise counts into probabilities after additive smoothing.
///
/// An all-zero histogram becomes the uniform distribution.
fn smoothed_pmf(counts: &[u64; BIN_COUNT]) -> Vec<f64> {
    let total: f64 = counts.iter().map(|&c| c as f64 + SMOOTHING).sum();
    counts
        .iter()
        .map(|&c| (c as f64 + SMOOTHING) / total)
        .collect()
}

fn to_bins(labels: &[String], probabilities: &[f64]) -> Vec<BinProbability> {
    labels
        .iter()
        .zip(probabilities)
        .map(|(range, &probability)| BinProbability {
            range: range.clone(),
            probability,
        })
        .collect()
}
