//! The query broker: catalog lookup, binding, fan-out, merge, analytics.

use crate::analytics;
use crate::binder::{Binder, FieldSpec};
use crate::catalog::Catalog;
use crate::dispatch::Dispatcher;
use crate::error::BrokerError;
use crate::models::{AnalyticsKey, AnalyticsResult, BoundQuery, Endpoint, MergedResult, QueryTemplate};
use crate::results;
use std::collections::BTreeMap;
use tracing::info;

/// Owns the catalog, the endpoint registry snapshot, and the dispatcher.
pub struct Broker {
    catalog: Catalog,
    binder: Binder,
    dispatcher: Dispatcher,
    endpoints: Vec<Endpoint>,
}

impl Broker {
    /// Build a broker. The `question` parameter, where a template declares it,
    /// accepts any catalog id.
    pub fn new(catalog: Catalog, endpoints: Vec<Endpoint>, dispatcher: Dispatcher) -> Self {
        let choices = catalog.list().iter().map(|t| t.id.to_string()).collect();
        Self {
            catalog,
            binder: Binder::new(choices),
            dispatcher,
            endpoints,
        }
    }

    pub fn list_templates(&self) -> &[QueryTemplate] {
        self.catalog.list()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Resolve a raw template id, or a full content hash.
    pub fn template(&self, raw_id: &str) -> Result<&QueryTemplate, BrokerError> {
        match self.catalog.get_by_index(raw_id) {
            Ok(template) => Ok(template),
            Err(err) => self.catalog.find_by_hash(raw_id).ok_or(err.into()),
        }
    }

    /// The input fields a template expects.
    pub fn fields(&self, raw_id: &str) -> Result<Vec<FieldSpec>, BrokerError> {
        Ok(self.binder.fields(self.template(raw_id)?))
    }

    /// Resolve and bind a template. Nothing is sent.
    pub fn bind(
        &self,
        raw_id: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<BoundQuery, BrokerError> {
        let template = self.template(raw_id)?;
        Ok(self.binder.bind(template, params)?)
    }

    /// Fan the query out to every registered endpoint and merge the answers.
    pub async fn dispatch_and_merge(&self, bound: &BoundQuery) -> MergedResult {
        let outcomes = self.dispatcher.dispatch(bound, &self.endpoints).await;
        results::merge(&outcomes)
    }

    /// Bind, dispatch, and merge in one step.
    pub async fn run(
        &self,
        raw_id: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<(BoundQuery, MergedResult), BrokerError> {
        let bound = self.bind(raw_id, params)?;
        let merged = self.dispatch_and_merge(&bound).await;
        Ok((bound, merged))
    }

    /// Bind the template tagged with `key`. Nothing is sent.
    pub fn bind_analytics(
        &self,
        key: AnalyticsKey,
        params: &BTreeMap<String, String>,
    ) -> Result<BoundQuery, BrokerError> {
        let template = self
            .catalog
            .find_by_analytics_key(key)
            .ok_or_else(|| BrokerError::UnknownAnalyticsKey(key.to_string()))?;
        Ok(self.binder.bind(template, params)?)
    }

    /// Run the template tagged with `key` and reduce its merged rows.
    pub async fn run_analytics(
        &self,
        key: AnalyticsKey,
        params: &BTreeMap<String, String>,
    ) -> Result<AnalyticsResult, BrokerError> {
        let bound = self.bind_analytics(key, params)?;
        info!("Running {} analytics with template {}", key, bound.template_id);

        let merged = self.dispatch_and_merge(&bound).await;
        Ok(analytics::analyze(key, bound.template_id, &merged))
    }
}
