//! Declarative input contract for a template's parameters.
//!
//! Each parameter name becomes a required field. The `question` parameter
//! is restricted to a choice set; every other parameter is free text.

use crate::error::BindError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Parameter name that is constrained to an enumerated choice set.
pub const QUESTION_FIELD: &str = "question";

/// What kind of input a field accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "choices", rename_all = "snake_case")]
pub enum FieldKind {
    Choice(Vec<String>),
    Text,
}

/// One input field derived from a parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
}

/// Human label for a parameter name: underscores become spaces, first letter capitalised.
pub fn field_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Build the field list for an ordered set of parameter names.
pub fn build_fields(param_names: &[String], question_choices: &[String]) -> Vec<FieldSpec> {
    param_names
        .iter()
        .map(|name| FieldSpec {
            name: name.clone(),
            label: field_label(name),
            kind: if name == QUESTION_FIELD {
                FieldKind::Choice(question_choices.to_vec())
            } else {
                FieldKind::Text
            },
            required: true,
        })
        .collect()
}

/// Check submitted values against the fields and return the cleaned values.
///
/// Values are trimmed. Every missing or blank required field is reported
/// together; choice violations are reported once all fields are present.
pub fn validate(
    fields: &[FieldSpec],
    values: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, BindError> {
    let mut cleaned = BTreeMap::new();
    let mut missing = Vec::new();

    for field in fields {
        let value = values.get(&field.name).map(|v| v.trim()).unwrap_or("");
        if value.is_empty() {
            if field.required {
                missing.push(field.name.clone());
            }
            continue;
        }
        cleaned.insert(field.name.clone(), value.to_string());
    }

    if !missing.is_empty() {
        return Err(BindError::MissingParams(missing));
    }

    for field in fields {
        if let FieldKind::Choice(ref choices) = field.kind {
            if let Some(value) = cleaned.get(&field.name) {
                if !choices.iter().any(|c| c == value) {
                    return Err(BindError::InvalidChoice {
                        field: field.name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
    }

    Ok(cleaned)
}
