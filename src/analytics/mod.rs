//! Analytics reductions over merged tabular rows.
//!
//! Both reductions are pure and never fail: rows without usable data are
//! skipped and an empty input yields an empty summary.

pub mod brackets;
pub mod divergence;

use crate::models::{AnalyticsKey, AnalyticsResult, AnalyticsSummary, MergedResult};
use tracing::debug;

pub use brackets::aggregate_brackets;
pub use divergence::{histogram_divergence, kl_divergence, split_ages};

/// Apply the reduction selected by `key` to the merged rows.
pub fn reduce(key: AnalyticsKey, merged: &MergedResult) -> AnalyticsSummary {
    let rows = merged.rows.iter().map(|r| &r.values);
    debug!("Reducing {} rows with {}", merged.rows.len(), key);

    match key {
        AnalyticsKey::AgeDist => AnalyticsSummary::AgeDist(aggregate_brackets(rows)),
        AnalyticsKey::KlDiv => {
            let (ages_true, ages_false) = split_ages(rows);
            AnalyticsSummary::KlDiv(histogram_divergence(&ages_true, &ages_false))
        }
    }
}

/// Reduce and attach endpoint coverage.
pub fn analyze(key: AnalyticsKey, template_id: usize, merged: &MergedResult) -> AnalyticsResult {
    AnalyticsResult {
        template_id,
        summary: reduce(key, merged),
        responders: merged.responders(),
        failed: merged.failed.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Binding, EndpointResponse, MergedRow};

    fn row(endpoint: &str, pairs: &[(&str, &str)]) -> MergedRow {
        let values: Binding = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect();
        MergedRow {
            endpoint: endpoint.to_string(),
            logo_url: String::new(),
            values,
        }
    }

    #[test]
    fn test_analyze_reports_coverage() {
        let merged = MergedResult {
            responses: vec![EndpointResponse::Empty {
                endpoint: "a".to_string(),
                logo_url: String::new(),
            }],
            rows: vec![
                row("a", &[("bracket", "40"), ("n", "2")]),
                row("a", &[("bracket", "40"), ("n", "1")]),
            ],
            failed: vec!["b".to_string()],
            failures: vec!["request timed out".to_string()],
            timings: Vec::new(),
        };

        let result = analyze(AnalyticsKey::AgeDist, 7, &merged);
        assert_eq!(result.template_id, 7);
        assert_eq!(result.responders, vec!["a"]);
        assert_eq!(result.failed, vec!["b"]);
        let AnalyticsSummary::AgeDist(counts) = result.summary else {
            panic!("expected ageDist summary");
        };
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].n, 3);
    }

    #[test]
    fn test_kl_reduce_on_empty_merge() {
        let summary = reduce(AnalyticsKey::KlDiv, &MergedResult::default());
        let AnalyticsSummary::KlDiv(div) = summary else {
            panic!("expected klDiv summary");
        };
        assert!(div.distribution_true.is_empty());
        assert!(div.distribution_false.is_empty());
        assert_eq!(div.kl_divergence, None);
    }
}
