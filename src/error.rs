//! Error types for the query broker.
//!
//! Only template resolution and parameter validation can stop a request.
//! Transport failures are kept per endpoint and never abort a fan-out.

use thiserror::Error;

/// A template id that does not resolve to a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The id is not a number.
    #[error("invalid template id: {0:?}")]
    InvalidId(String),
    /// The id is a number but outside the catalog.
    #[error("template id {index} out of range (catalog has {len} templates)")]
    OutOfRange { index: usize, len: usize },
}

/// Parameter validation failure, reported before any dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// One or more declared parameters were absent or empty.
    #[error("missing required parameter(s): {}", .0.join(", "))]
    MissingParams(Vec<String>),
    /// A choice field received a value outside its choice set.
    #[error("invalid value {value:?} for field {field}")]
    InvalidChoice { field: String, value: String },
}

/// Why a single endpoint produced no response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("endpoint returned HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Errors surfaced by the broker's inbound operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("Unknown query template: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error("no template carries analytics key {0}")]
    UnknownAnalyticsKey(String),
}

impl BrokerError {
    /// True when the request named a template the catalog cannot resolve.
    pub fn is_unknown_template(&self) -> bool {
        matches!(self, BrokerError::Catalog(_))
    }
}
