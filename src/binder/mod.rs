//! Parameter binding.
//!
//! Substitution is plain text replacement of `{name}` with the submitted
//! value. Values are not escaped: some templates already quote their
//! placeholders (`"{sex}"`) and others do not, so a value containing SPARQL
//! syntax changes the query shape. Callers exposing this to untrusted input
//! must restrict values upstream.

pub mod form;

use crate::error::BindError;
use crate::models::{BoundQuery, QueryTemplate};
use std::collections::BTreeMap;
use tracing::debug;

pub use form::{build_fields, FieldKind, FieldSpec};

/// Namespace declarations prepended to every dispatched query.
pub const PREFIXES: &str = "PREFIX bto:   <https://w3id.org/brainteaser/ontology/schema/>
PREFIX skos:  <http://www.w3.org/2004/02/skos/core#>
PREFIX xsd:   <http://www.w3.org/2001/XMLSchema#>
PREFIX NCIT:  <http://purl.obolibrary.org/obo/NCIT_>
";

/// Rewrite `<{` and `}>` so URI placeholders are visibly non-executable.
pub fn mask_template(text: &str) -> String {
    text.replace("<{", "**<").replace("}>", ">**")
}

/// Replace every `{name}` with its value, in parameter order.
pub fn substitute(text: &str, param_names: &[String], values: &BTreeMap<String, String>) -> String {
    let mut out = text.to_string();
    for name in param_names {
        if let Some(value) = values.get(name) {
            out = out.replace(&format!("{{{}}}", name), value);
        }
    }
    out
}

/// Binds templates, validating values against the template's field spec.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    question_choices: Vec<String>,
}

impl Binder {
    pub fn new(question_choices: Vec<String>) -> Self {
        Self { question_choices }
    }

    /// Field spec for a template's parameters.
    pub fn fields(&self, template: &QueryTemplate) -> Vec<FieldSpec> {
        build_fields(&template.param_names, &self.question_choices)
    }

    /// Validate `values` and produce a dispatch-ready query.
    ///
    /// Fails before any substitution if a declared parameter is missing or blank.
    pub fn bind(
        &self,
        template: &QueryTemplate,
        values: &BTreeMap<String, String>,
    ) -> Result<BoundQuery, BindError> {
        let cleaned = form::validate(&self.fields(template), values)?;

        let body = substitute(&template.text, &template.param_names, &cleaned);
        let full_text = format!("{}{}", PREFIXES, body);
        debug!("Bound template {}: {} bytes", template.id, full_text.len());

        Ok(BoundQuery {
            template_id: template.id,
            full_text,
            masked_template_text: mask_template(&template.text),
            param_values: cleaned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_bind_substitutes_every_placeholder() {
        let catalog = Catalog::load();
        let template = catalog.get_by_index("1").unwrap();
        let bound = Binder::default()
            .bind(template, &values(&[("disease", "NCIT:C34373"), ("age", "40")]))
            .unwrap();

        assert!(!bound.full_text.contains("{disease}"));
        assert!(!bound.full_text.contains("{age}"));
        assert!(bound.full_text.contains("bto:hasDisease NCIT:C34373"));
        assert!(bound.full_text.contains("FILTER(?aO < 40)"));
        assert!(bound.full_text.starts_with(PREFIXES));
        assert_eq!(bound.template_id, 1);
    }

    #[test]
    fn test_bind_repeated_placeholder() {
        let catalog = Catalog::load();
        let template = catalog
            .list()
            .iter()
            .find(|t| t.param_names.contains(&"age3".to_string()))
            .unwrap();
        let bound = Binder::default()
            .bind(
                template,
                &values(&[
                    ("disease", "NCIT:C34373"),
                    ("age1", "18"),
                    ("age2", "40"),
                    ("age3", "40"),
                ]),
            )
            .unwrap();
        assert!(bound.full_text.contains("IF(?ageOn < 18, \"18\","));
        assert!(bound.full_text.contains("\"18–40\""));
        assert!(!bound.full_text.contains("{age1}"));
    }

    #[test]
    fn test_bind_rejects_missing_and_empty() {
        let catalog = Catalog::load();
        let template = catalog.get_by_index("1").unwrap();
        let binder = Binder::default();

        let err = binder
            .bind(template, &values(&[("disease", "NCIT:C34373")]))
            .unwrap_err();
        assert_eq!(err, BindError::MissingParams(vec!["age".to_string()]));

        let err = binder
            .bind(template, &values(&[("disease", ""), ("age", "40")]))
            .unwrap_err();
        assert_eq!(err, BindError::MissingParams(vec!["disease".to_string()]));
    }

    #[test]
    fn test_bind_template_without_params() {
        let catalog = Catalog::load();
        let template = catalog.list().iter().find(|t| t.param_names.is_empty()).unwrap();
        let bound = Binder::default().bind(template, &BTreeMap::new()).unwrap();
        assert!(bound.full_text.ends_with(&template.text));
        assert!(bound.param_values.is_empty());
    }

    #[test]
    fn test_values_are_not_escaped() {
        let names = vec!["sex".to_string()];
        let out = substitute(
            r#"bto:sex "{sex}" ."#,
            &names,
            &values(&[("sex", r#"F" ; ?p ?o . #"#)]),
        );
        assert_eq!(out, r#"bto:sex "F" ; ?p ?o . #" ."#);
    }

    #[test]
    fn test_mask_template() {
        assert_eq!(
            mask_template("?s a <{type}> ; bto:x {v} ."),
            "?s a **<type>** ; bto:x {v} ."
        );
    }

    #[test]
    fn test_masked_template_keeps_placeholders() {
        let catalog = Catalog::load();
        let template = catalog.get_by_index("0").unwrap();
        let bound = Binder::default()
            .bind(template, &values(&[("disease", "NCIT:C34373")]))
            .unwrap();
        assert!(bound.masked_template_text.contains("{disease}"));
        assert!(!bound.masked_template_text.contains("PREFIX"));
    }
}
