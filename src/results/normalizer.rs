//! SPARQL JSON result classification.
//!
//! Shapes are recognised in priority order: `boolean` key, then
//! `head.vars` with `results.bindings`, then a bare `results` key.
//! Anything else is malformed.

use crate::dispatch::{EndpointOutcome, RawOutcome};
use crate::models::{Binding, Endpoint, EndpointResponse, EndpointTiming, MergedResult, MergedRow};
use serde_json::{Map, Value};
use tracing::debug;

/// Classify one endpoint's response body.
///
/// Tags come from the registry entry, never from the remote payload.
pub fn classify(endpoint: &Endpoint, body: &str) -> EndpointResponse {
    let endpoint_name = endpoint.name.clone();
    let logo_url = endpoint.logo_url.clone();
    let malformed = || EndpointResponse::Malformed {
        endpoint: endpoint.name.clone(),
        logo_url: endpoint.logo_url.clone(),
    };

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        debug!("Endpoint {} returned non-JSON body", endpoint.name);
        return malformed();
    };
    let Some(obj) = json.as_object() else {
        return malformed();
    };

    if let Some(value) = obj.get("boolean") {
        return match value.as_bool() {
            Some(value) => EndpointResponse::Boolean {
                endpoint: endpoint_name,
                logo_url,
                value,
            },
            None => malformed(),
        };
    }

    let vars = obj
        .get("head")
        .and_then(|h| h.get("vars"))
        .and_then(Value::as_array);
    let bindings = obj
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(Value::as_array);

    if let (Some(vars), Some(bindings)) = (vars, bindings) {
        let vars: Vec<String> = vars
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        let rows = bindings
            .iter()
            .map(|b| extract_row(&vars, b.as_object()))
            .collect();

        return EndpointResponse::Tabular {
            endpoint: endpoint_name,
            logo_url,
            vars,
            rows,
        };
    }

    if obj.contains_key("results") {
        return EndpointResponse::Empty {
            endpoint: endpoint_name,
            logo_url,
        };
    }

    malformed()
}

/// One row with an entry for every declared variable; unbound ones are `None`.
fn extract_row(vars: &[String], binding: Option<&Map<String, Value>>) -> Binding {
    vars.iter()
        .map(|var| {
            let value = binding
                .and_then(|b| b.get(var))
                .and_then(|cell| cell.get("value"))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
            (var.clone(), value)
        })
        .collect()
}

/// Classify a dispatch outcome; transport failures become `Failed`.
pub fn normalize(outcome: &EndpointOutcome) -> EndpointResponse {
    match &outcome.outcome {
        RawOutcome::Body(body) => classify(&outcome.endpoint, body),
        RawOutcome::Failed(err) => EndpointResponse::Failed {
            endpoint: outcome.endpoint.name.clone(),
            error: err.to_string(),
        },
    }
}

/// Merge all outcomes, keeping the order they are given in.
pub fn merge(outcomes: &[EndpointOutcome]) -> MergedResult {
    let mut merged = MergedResult::default();

    for outcome in outcomes {
        merged.timings.push(EndpointTiming {
            endpoint: outcome.endpoint.name.clone(),
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            answered: matches!(outcome.outcome, RawOutcome::Body(_)),
        });

        match normalize(outcome) {
            EndpointResponse::Failed { endpoint, error } => {
                merged.failed.push(endpoint);
                merged.failures.push(error);
            }
            response => {
                if let EndpointResponse::Tabular {
                    ref endpoint,
                    ref logo_url,
                    ref rows,
                    ..
                } = response
                {
                    merged.rows.extend(rows.iter().map(|values| MergedRow {
                        endpoint: endpoint.clone(),
                        logo_url: logo_url.clone(),
                        values: values.clone(),
                    }));
                }
                merged.responses.push(response);
            }
        }
    }

    merged
}
