//! Bounded-concurrency HTTP fan-out.

use crate::config::DispatchSettings;
use crate::error::TransportError;
use crate::models::{BoundQuery, Endpoint};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Media type requested from every endpoint.
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Content type of the posted form body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Timeout applied to each endpoint request on its own.
    pub timeout: Duration,
    /// Maximum number of requests in flight.
    pub concurrency: usize,
    /// Path appended to each endpoint's base URL.
    pub endpoint_path: String,
    pub show_progress: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from(&DispatchSettings::default())
    }
}

impl From<&DispatchSettings> for DispatchConfig {
    fn from(settings: &DispatchSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_seconds.max(1)),
            concurrency: settings.concurrency,
            endpoint_path: settings.endpoint_path.clone(),
            show_progress: settings.show_progress,
        }
    }
}

/// What came back from one endpoint, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// A 2xx response and its body.
    Body(String),
    Failed(TransportError),
}

/// One endpoint's outcome with the time it took.
#[derive(Debug, Clone)]
pub struct EndpointOutcome {
    pub endpoint: Endpoint,
    pub outcome: RawOutcome,
    pub elapsed: Duration,
}

/// Sends bound queries to a set of endpoints.
pub struct Dispatcher {
    config: DispatchConfig,
    http_client: reqwest::Client,
}

impl Dispatcher {
    /// Create a dispatcher with its own HTTP client.
    pub fn new(config: DispatchConfig) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Post the query to every endpoint and return one outcome per endpoint.
    ///
    /// Requests run concurrently up to the configured cap; the returned
    /// outcomes follow the order of `endpoints`, not completion order.
    pub async fn dispatch(&self, bound: &BoundQuery, endpoints: &[Endpoint]) -> Vec<EndpointOutcome> {
        if endpoints.is_empty() {
            warn!("No endpoints registered; nothing to dispatch");
            return Vec::new();
        }

        let concurrency = self.config.concurrency.max(1).min(endpoints.len());
        info!(
            "Dispatching template {} to {} endpoints (concurrency {}, timeout {:?})",
            bound.template_id,
            endpoints.len(),
            concurrency,
            self.config.timeout
        );

        let progress = self.progress_bar(endpoints.len());

        let mut completed = stream::iter(endpoints.iter().enumerate().map(|(idx, endpoint)| {
            let progress = progress.clone();
            async move {
                let started = Instant::now();
                let outcome = self.post(endpoint, bound).await;
                let elapsed = started.elapsed();

                if let RawOutcome::Failed(ref err) = outcome {
                    warn!("Endpoint {} failed: {}", endpoint.name, err);
                } else {
                    debug!("Endpoint {} answered in {:?}", endpoint.name, elapsed);
                }
                if let Some(pb) = progress {
                    pb.inc(1);
                }

                (
                    idx,
                    EndpointOutcome {
                        endpoint: endpoint.clone(),
                        outcome,
                        elapsed,
                    },
                )
            }
        }))
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        completed.sort_by_key(|(idx, _)| *idx);
        let outcomes: Vec<EndpointOutcome> = completed.into_iter().map(|(_, o)| o).collect();

        let failed = outcomes
            .iter()
            .filter(|o| matches!(o.outcome, RawOutcome::Failed(_)))
            .count();
        info!(
            "Dispatch complete: {} answered, {} failed",
            outcomes.len() - failed,
            failed
        );

        outcomes
    }

    /// Issue the POST for one endpoint. Never returns an error: failures become outcomes.
    async fn post(&self, endpoint: &Endpoint, bound: &BoundQuery) -> RawOutcome {
        match self.try_post(endpoint, bound).await {
            Ok(body) => RawOutcome::Body(body),
            Err(err) => RawOutcome::Failed(err),
        }
    }

    async fn try_post(&self, endpoint: &Endpoint, bound: &BoundQuery) -> Result<String, TransportError> {
        let url = endpoint.query_url(&self.config.endpoint_path);
        let form = [
            ("template", bound.masked_template_text.as_str()),
            ("query", bound.full_text.as_str()),
        ];

        let mut request = self
            .http_client
            .post(&url)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .form(&form)
            .build()?;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

        debug!("POST {} ({} byte query)", url, bound.full_text.len());

        let response = self.http_client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} endpoints")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        Some(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::mock::{MockEndpoint, MockNetwork};
    use std::collections::BTreeMap;

    fn bound_query() -> BoundQuery {
        BoundQuery {
            template_id: 0,
            full_text: "PREFIX bto: <x>\nASK WHERE { ?s a bto:Patient }".to_string(),
            masked_template_text: "ASK WHERE { ?s a **<t>** }".to_string(),
            param_values: BTreeMap::new(),
        }
    }

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            timeout: Duration::from_millis(400),
            concurrency: 8,
            endpoint_path: "/sparql-protected/".to_string(),
            show_progress: false,
        }
    }

    #[test]
    fn test_zero_timeout_setting_is_clamped() {
        let settings = DispatchSettings {
            timeout_seconds: 0,
            ..DispatchSettings::default()
        };
        assert_eq!(DispatchConfig::from(&settings).timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_dispatch_config_default() {
        let config = DispatchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.endpoint_path, "/sparql-protected/");
    }

    #[tokio::test]
    async fn test_request_shape() {
        let network = MockNetwork::start(vec![MockEndpoint::ok("alpha", r#"{"boolean": true}"#)]).await;
        let dispatcher = Dispatcher::new(fast_config()).unwrap();

        let outcomes = dispatcher
            .dispatch(&bound_query(), &[network.endpoint("alpha")])
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].outcome,
            RawOutcome::Body(r#"{"boolean": true}"#.to_string())
        );

        let requests = network.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.accept, SPARQL_RESULTS_JSON);
        assert_eq!(request.content_type, FORM_CONTENT_TYPE);
        assert!(request.body.starts_with("template="));
        assert!(request.body.contains("&query="));
        assert!(request.body.contains("bto%3APatient"));
    }

    #[tokio::test]
    async fn test_timeout_is_isolated_and_order_is_stable() {
        let network = MockNetwork::start(vec![
            MockEndpoint::ok("alpha", r#"{"boolean": true}"#).delayed(Duration::from_millis(150)),
            MockEndpoint::ok("slow", r#"{"boolean": true}"#).delayed(Duration::from_secs(3)),
            MockEndpoint::ok("beta", r#"{"boolean": false}"#),
        ])
        .await;
        let dispatcher = Dispatcher::new(fast_config()).unwrap();
        let endpoints = vec![
            network.endpoint("alpha"),
            network.endpoint("slow"),
            network.endpoint("beta"),
        ];

        let started = Instant::now();
        let outcomes = dispatcher.dispatch(&bound_query(), &endpoints).await;
        assert!(started.elapsed() < Duration::from_secs(2));

        let names: Vec<_> = outcomes.iter().map(|o| o.endpoint.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "slow", "beta"]);
        assert!(matches!(outcomes[0].outcome, RawOutcome::Body(_)));
        assert_eq!(outcomes[1].outcome, RawOutcome::Failed(TransportError::Timeout));
        assert!(matches!(outcomes[2].outcome, RawOutcome::Body(_)));
    }

    #[tokio::test]
    async fn test_http_error_status_is_failure() {
        let network = MockNetwork::start(vec![MockEndpoint::status("broken", 500)]).await;
        let dispatcher = Dispatcher::new(fast_config()).unwrap();

        let outcomes = dispatcher
            .dispatch(&bound_query(), &[network.endpoint("broken")])
            .await;
        assert_eq!(outcomes[0].outcome, RawOutcome::Failed(TransportError::Status(500)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_failure() {
        let dispatcher = Dispatcher::new(fast_config()).unwrap();
        let endpoints = vec![Endpoint::new("nowhere", "http://127.0.0.1:1")];

        let outcomes = dispatcher.dispatch(&bound_query(), &endpoints).await;
        assert!(matches!(outcomes[0].outcome, RawOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_concurrency_of_one_still_visits_everyone() {
        let network = MockNetwork::start(vec![
            MockEndpoint::ok("a", "{}"),
            MockEndpoint::ok("b", "{}"),
            MockEndpoint::ok("c", "{}"),
        ])
        .await;
        let config = DispatchConfig {
            concurrency: 1,
            ..fast_config()
        };
        let dispatcher = Dispatcher::new(config).unwrap();
        let endpoints: Vec<_> = ["a", "b", "c"].iter().map(|n| network.endpoint(n)).collect();

        let outcomes = dispatcher.dispatch(&bound_query(), &endpoints).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(network.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_no_endpoints() {
        let dispatcher = Dispatcher::new(fast_config()).unwrap();
        assert!(dispatcher.dispatch(&bound_query(), &[]).await.is_empty());
    }
}
