//! Fan-out dispatch of bound queries to every registered endpoint.
//!
//! Each endpoint is queried independently with its own timeout. Failures
//! are recorded per endpoint and never abort the siblings.

pub mod fanout;

#[cfg(test)]
pub(crate) mod mock;

pub use fanout::{DispatchConfig, Dispatcher, EndpointOutcome, RawOutcome};
