//! Markdown and JSON rendering.
//!
//! This module renders the catalog, template descriptions, bound queries,
//! merged endpoint results, and analytics summaries.

use crate::binder::{FieldKind, FieldSpec};
use crate::models::{
    AggregatedBracketCount, AnalyticsResult, AnalyticsSummary, BoundQuery, EndpointResponse,
    HistogramDivergence, MergedResult, QueryTemplate, RunMetadata,
};
use anyhow::Result;
use serde::Serialize;

/// Everything a query run produced, as written out in JSON mode.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport<'a> {
    pub metadata: &'a RunMetadata,
    pub query: &'a BoundQuery,
    pub result: &'a MergedResult,
}

/// Everything an analytics run produced, as written out in JSON mode.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport<'a> {
    pub metadata: &'a RunMetadata,
    pub analytics: &'a AnalyticsResult,
}

/// Template description together with its input form.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateDescription<'a> {
    pub template: &'a QueryTemplate,
    pub fields: &'a [FieldSpec],
}

/// Serialize any report value as pretty JSON.
pub fn generate_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

/// Render the catalog as a Markdown table.
pub fn generate_catalog_markdown(templates: &[QueryTemplate]) -> String {
    let mut output = String::new();

    output.push_str("# Query Templates\n\n");

    if templates.is_empty() {
        output.push_str("No query templates are defined.\n");
        return output;
    }

    output.push_str("| Id | Level | Hash | Parameters | Analytics | Description |\n");
    output.push_str("|:---:|:---:|:---|:---|:---:|:---|\n");

    for template in templates {
        let params = if template.param_names.is_empty() {
            "-".to_string()
        } else {
            template
                .param_names
                .iter()
                .map(|p| format!("`{}`", p))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let analytics = template
            .analytics_key
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());

        output.push_str(&format!(
            "| {} | {} | `{}` | {} | {} | {} |\n",
            template.id,
            template.level,
            template.short_hash(),
            params,
            analytics,
            escape_cell(&template.description),
        ));
    }
    output.push('\n');

    output
}

/// Render one template's text and the fields it expects.
pub fn generate_template_markdown(template: &QueryTemplate, fields: &[FieldSpec]) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Template {}\n\n", template.id));
    output.push_str(&format!("- **Level:** {}\n", template.level));
    output.push_str(&format!("- **Content hash:** `{}`\n", template.content_hash));
    if let Some(key) = template.analytics_key {
        output.push_str(&format!("- **Analytics:** {}\n", key));
    }
    output.push('\n');

    if !template.description.is_empty() {
        output.push_str(&template.description);
        output.push_str("\n\n");
    }

    output.push_str("## Query\n\n```sparql\n");
    output.push_str(template.text.trim_end());
    output.push_str("\n```\n\n");

    output.push_str(&generate_fields_section(fields));

    output
}

/// Render the input form for a template.
fn generate_fields_section(fields: &[FieldSpec]) -> String {
    let mut section = String::new();

    section.push_str("## Parameters\n\n");

    if fields.is_empty() {
        section.push_str("This template takes no parameters.\n\n");
        return section;
    }

    section.push_str("| Name | Label | Input | Required |\n");
    section.push_str("|:---|:---|:---|:---:|\n");

    for field in fields {
        let input = match &field.kind {
            FieldKind::Text => "text".to_string(),
            FieldKind::Choice(choices) => format!("one of: {}", choices.join(", ")),
        };
        section.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            field.name,
            field.label,
            input,
            if field.required { "yes" } else { "no" }
        ));
    }
    section.push('\n');

    section
}

/// Render a bound query without sending it.
pub fn generate_bound_query_markdown(bound: &BoundQuery) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Bound Query (template {})\n\n", bound.template_id));

    if !bound.param_values.is_empty() {
        output.push_str("## Values\n\n");
        for (name, value) in &bound.param_values {
            output.push_str(&format!("- **{}:** {}\n", name, value));
        }
        output.push('\n');
    }

    output.push_str("## Template\n\n```\n");
    output.push_str(bound.masked_template_text.trim_end());
    output.push_str("\n```\n\n");

    output.push_str("## Query\n\n```sparql\n");
    output.push_str(bound.full_text.trim_end());
    output.push_str("\n```\n");

    output
}

/// Render a merged fan-out result.
pub fn generate_results_markdown(metadata: &RunMetadata, result: &MergedResult) -> String {
    let mut output = String::new();

    output.push_str("# Query Results\n\n");
    output.push_str(&generate_metadata_section(metadata));
    output.push_str(&generate_failures_section(&result.failed, &result.failures));
    output.push_str(&generate_endpoint_section(result));
    output.push_str(&generate_rows_section(result));
    output.push_str(&generate_footer());

    output
}

/// Render an analytics run.
pub fn generate_analytics_markdown(metadata: &RunMetadata, analytics: &AnalyticsResult) -> String {
    let mut output = String::new();

    output.push_str("# Analytics\n\n");
    output.push_str(&generate_metadata_section(metadata));
    output.push_str(&generate_failures_section(&analytics.failed, &[]));

    output.push_str("## Responding Endpoints\n\n");
    if analytics.responders.is_empty() {
        output.push_str("No endpoint responded.\n\n");
    } else {
        for name in &analytics.responders {
            output.push_str(&format!("- {}\n", name));
        }
        output.push('\n');
    }

    match &analytics.summary {
        AnalyticsSummary::AgeDist(counts) => output.push_str(&generate_age_dist_section(counts)),
        AnalyticsSummary::KlDiv(divergence) => {
            output.push_str(&generate_divergence_section(divergence))
        }
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Template:** {}\n", metadata.template_id));
    if !metadata.description.is_empty() {
        section.push_str(&format!("- **Description:** {}\n", metadata.description));
    }
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Endpoints Contacted:** {}\n",
        metadata.endpoints_contacted
    ));
    if metadata.endpoints_failed > 0 {
        section.push_str(&format!(
            "- **Endpoints Failed:** {}\n",
            metadata.endpoints_failed
        ));
    }
    section.push_str(&format!("- **Duration:** {:.1}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

/// Warn about endpoints that did not answer. `reasons` may be empty.
fn generate_failures_section(failed: &[String], reasons: &[String]) -> String {
    if failed.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("> **Warning:** results are partial. These endpoints did not answer:\n");
    for (i, name) in failed.iter().enumerate() {
        match reasons.get(i) {
            Some(reason) => section.push_str(&format!("> - {} ({})\n", name, reason)),
            None => section.push_str(&format!("> - {}\n", name)),
        }
    }
    section.push('\n');

    section
}

/// Per-endpoint status table.
fn generate_endpoint_section(result: &MergedResult) -> String {
    let mut section = String::new();

    section.push_str("## Endpoints\n\n");

    if result.responses.is_empty() {
        section.push_str("No endpoint responded.\n\n");
        return section;
    }

    section.push_str("| Endpoint | Status | Answer | Time |\n");
    section.push_str("|:---|:---|:---|---:|\n");

    for (response, elapsed_ms) in result.timed_responses() {
        let answer = match response {
            EndpointResponse::Boolean { value: true, .. } => "yes".to_string(),
            EndpointResponse::Boolean { value: false, .. } => "no".to_string(),
            EndpointResponse::Tabular { rows, .. } => format!("{} rows", rows.len()),
            EndpointResponse::Empty { .. } => "no results".to_string(),
            EndpointResponse::Malformed { .. } | EndpointResponse::Failed { .. } => {
                "-".to_string()
            }
        };
        let elapsed = elapsed_ms
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_else(|| "-".to_string());

        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            escape_cell(response.endpoint()),
            response.status_label(),
            answer,
            elapsed
        ));
    }
    section.push('\n');

    section
}

/// Column names across every tabular response, first-seen order.
fn collect_columns(result: &MergedResult) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for response in &result.responses {
        if let EndpointResponse::Tabular { vars, .. } = response {
            for var in vars {
                if !columns.contains(var) {
                    columns.push(var.clone());
                }
            }
        }
    }
    columns
}

/// All tabular rows, tagged with their endpoint.
fn generate_rows_section(result: &MergedResult) -> String {
    let columns = collect_columns(result);
    if columns.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Rows\n\n");

    if result.rows.is_empty() {
        section.push_str("The query matched no rows.\n\n");
        return section;
    }

    section.push_str("| Endpoint |");
    for column in &columns {
        section.push_str(&format!(" {} |", column));
    }
    section.push_str("\n|:---|");
    section.push_str(&":---|".repeat(columns.len()));
    section.push('\n');

    for row in &result.rows {
        section.push_str(&format!("| {} |", escape_cell(&row.endpoint)));
        for column in &columns {
            let value = row
                .values
                .get(column)
                .and_then(|v| v.as_deref())
                .unwrap_or("");
            section.push_str(&format!(" {} |", escape_cell(value)));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

fn generate_age_dist_section(counts: &[AggregatedBracketCount]) -> String {
    let mut section = String::new();

    section.push_str("## Age Distribution\n\n");

    if counts.is_empty() {
        section.push_str("No bracket counts were returned.\n\n");
        return section;
    }

    let total: i64 = counts.iter().map(|c| c.n).sum();

    section.push_str("| Bracket | Patients |\n");
    section.push_str("|:---|---:|\n");
    for count in counts {
        section.push_str(&format!("| {} | {} |\n", escape_cell(&count.bracket), count.n));
    }
    section.push_str(&format!("| **Total** | **{}** |\n\n", total));

    section
}

fn generate_divergence_section(divergence: &HistogramDivergence) -> String {
    let mut section = String::new();

    section.push_str("## Onset Age Divergence\n\n");

    let Some(kl) = divergence.kl_divergence else {
        section.push_str("No usable onset ages were returned.\n\n");
        return section;
    };

    section.push_str(&format!("**KL divergence (true ‖ false):** {:.4}\n\n", kl));
    section.push_str("| Age range | P(true) | P(false) |\n");
    section.push_str("|:---|---:|---:|\n");
    for (t, f) in divergence
        .distribution_true
        .iter()
        .zip(&divergence.distribution_false)
    {
        section.push_str(&format!(
            "| {} | {:.4} | {:.4} |\n",
            t.range, t.probability, f.probability
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Generated by fanquery*\n".to_string()
}

/// Keep table cells on one line and away from column separators.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\n', '\r'], " ")
}
