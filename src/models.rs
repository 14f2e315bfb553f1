//! Data models for the query broker.
//!
//! This module contains the core data structures shared by the catalog,
//! binder, dispatcher, normalizer, and analytics reducers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Analytics reduction attached to a template's result shape.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum AnalyticsKey {
    /// Summed patient counts per age bracket.
    #[serde(rename = "ageDist")]
    AgeDist,
    /// KL divergence between onset-age histograms split by a boolean flag.
    #[serde(rename = "klDiv")]
    KlDiv,
}

impl fmt::Display for AnalyticsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyticsKey::AgeDist => write!(f, "ageDist"),
            AnalyticsKey::KlDiv => write!(f, "klDiv"),
        }
    }
}

/// One canned, parameterized query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTemplate {
    /// Position within the catalog ordering.
    pub id: usize,
    /// Hex-encoded SHA-512 digest of `text`.
    pub content_hash: String,
    /// Complexity/sensitivity level (0 = existence check, 6 = raw dump).
    pub level: u8,
    /// Placeholder names the template expects, in form order.
    pub param_names: Vec<String>,
    /// Raw template text with `{name}` placeholders.
    pub text: String,
    /// Human-readable summary.
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_key: Option<AnalyticsKey>,
}

impl QueryTemplate {
    /// Returns the first 12 hex digits of the content hash.
    pub fn short_hash(&self) -> &str {
        &self.content_hash[..self.content_hash.len().min(12)]
    }
}

/// A registered remote SPARQL endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub base_url: String,
    /// Locally hosted logo used to tag this endpoint's results.
    pub logo_url: String,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let name = name.into();
        let logo_url = default_logo_url(&name);
        Self {
            name,
            base_url: base_url.into(),
            logo_url,
        }
    }

    /// The URL queries are posted to: base URL without trailing slashes, then `path`.
    pub fn query_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Logo path served from local media when an endpoint has none configured.
pub fn default_logo_url(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("/media/endpoint_logos/{}.png", slug.trim_matches('-'))
}

/// A template with its parameters substituted, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundQuery {
    pub template_id: usize,
    /// Prefix block followed by the substituted template.
    pub full_text: String,
    /// Original template with URI placeholders neutralized.
    pub masked_template_text: String,
    pub param_values: BTreeMap<String, String>,
}

/// One result row: variable name to value, `None` when the variable was unbound.
pub type Binding = BTreeMap<String, Option<String>>;

/// A single endpoint's answer after classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndpointResponse {
    Boolean {
        endpoint: String,
        logo_url: String,
        value: bool,
    },
    Tabular {
        endpoint: String,
        logo_url: String,
        vars: Vec<String>,
        rows: Vec<Binding>,
    },
    Empty {
        endpoint: String,
        logo_url: String,
    },
    Malformed {
        endpoint: String,
        logo_url: String,
    },
    Failed {
        endpoint: String,
        error: String,
    },
}

impl EndpointResponse {
    pub fn endpoint(&self) -> &str {
        match self {
            EndpointResponse::Boolean { endpoint, .. }
            | EndpointResponse::Tabular { endpoint, .. }
            | EndpointResponse::Empty { endpoint, .. }
            | EndpointResponse::Malformed { endpoint, .. }
            | EndpointResponse::Failed { endpoint, .. } => endpoint,
        }
    }

    /// Short status label for display.
    pub fn status_label(&self) -> &'static str {
        match self {
            EndpointResponse::Boolean { .. } => "boolean",
            EndpointResponse::Tabular { .. } => "rows",
            EndpointResponse::Empty { .. } => "empty",
            EndpointResponse::Malformed { .. } => "invalid response",
            EndpointResponse::Failed { .. } => "failed",
        }
    }
}

/// A tabular row tagged with the endpoint it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub endpoint: String,
    pub logo_url: String,
    pub values: Binding,
}

/// Wall-clock time spent on one endpoint during a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointTiming {
    pub endpoint: String,
    pub elapsed_ms: u64,
    /// False when the endpoint is in `failed` rather than `responses`.
    pub answered: bool,
}

/// Every endpoint's answer for one dispatch, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedResult {
    /// One entry per endpoint that answered (failed endpoints excluded).
    pub responses: Vec<EndpointResponse>,
    /// Tabular rows from all endpoints, flattened.
    pub rows: Vec<MergedRow>,
    /// Names of endpoints that failed to answer.
    pub failed: Vec<String>,
    /// Failure reason per failed endpoint, parallel to `failed`.
    pub failures: Vec<String>,
    /// One entry per endpoint contacted, in registration order.
    pub timings: Vec<EndpointTiming>,
}

impl MergedResult {
    /// Names of endpoints that produced a response, in registration order.
    pub fn responders(&self) -> Vec<String> {
        self.responses
            .iter()
            .map(|r| r.endpoint().to_string())
            .collect()
    }

    /// Each response paired with its elapsed time, matched by position.
    pub fn timed_responses(&self) -> Vec<(&EndpointResponse, Option<u64>)> {
        let mut answered = self.timings.iter().filter(|t| t.answered);
        self.responses
            .iter()
            .map(|r| (r, answered.next().map(|t| t.elapsed_ms)))
            .collect()
    }

    /// True when at least one endpoint failed.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Patient count for one bracket label, summed across endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedBracketCount {
    pub bracket: String,
    pub n: i64,
}

/// Probability mass of one histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinProbability {
    pub range: String,
    pub probability: f64,
}

/// Two empirical distributions over shared bins and their divergence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramDivergence {
    pub distribution_true: Vec<BinProbability>,
    pub distribution_false: Vec<BinProbability>,
    /// KL(true ‖ false); `None` when there was no usable data.
    pub kl_divergence: Option<f64>,
}

/// Statistics produced by one analytics reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "data")]
pub enum AnalyticsSummary {
    #[serde(rename = "ageDist")]
    AgeDist(Vec<AggregatedBracketCount>),
    #[serde(rename = "klDiv")]
    KlDiv(HistogramDivergence),
}

/// Reduction output plus endpoint coverage, so callers can warn on partial data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub template_id: usize,
    pub summary: AnalyticsSummary,
    pub responders: Vec<String>,
    pub failed: Vec<String>,
}

/// Metadata about one broker run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub template_id: usize,
    pub description: String,
    pub generated_at: DateTime<Utc>,
    pub endpoints_contacted: usize,
    pub endpoints_failed: usize,
    pub duration_seconds: f64,
}
