//! In-process SPARQL endpoints for tests.

use crate::models::Endpoint;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as seen by a mock endpoint.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub endpoint: String,
    pub accept: String,
    pub content_type: String,
    pub body: String,
}

/// Canned behaviour for one mock endpoint.
#[derive(Debug, Clone)]
pub struct MockEndpoint {
    pub name: String,
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl MockEndpoint {
    pub fn ok(name: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(name: &str, status: u16) -> Self {
        Self {
            name: name.to_string(),
            status,
            body: "error".to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A running server hosting every mock endpoint under `/<name>/sparql-protected/`.
pub struct MockNetwork {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockNetwork {
    pub async fn start(endpoints: Vec<MockEndpoint>) -> Self {
        let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let mut app = Router::new();

        for mock in endpoints {
            let path = format!("/{}/sparql-protected/", mock.name);
            let requests = requests.clone();
            app = app.route(
                &path,
                post(move |headers: HeaderMap, body: String| {
                    let mock = mock.clone();
                    let requests = requests.clone();
                    async move {
                        let header_str = |name: header::HeaderName| {
                            headers
                                .get(name)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or_default()
                                .to_string()
                        };
                        requests.lock().unwrap().push(CapturedRequest {
                            endpoint: mock.name.clone(),
                            accept: header_str(header::ACCEPT),
                            content_type: header_str(header::CONTENT_TYPE),
                            body,
                        });

                        if !mock.delay.is_zero() {
                            tokio::time::sleep(mock.delay).await;
                        }

                        (
                            StatusCode::from_u16(mock.status).unwrap(),
                            [(header::CONTENT_TYPE, "application/sparql-results+json")],
                            mock.body,
                        )
                    }
                }),
            );
        }

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("local_addr should succeed");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// Registry entry pointing at the named mock.
    pub fn endpoint(&self, name: &str) -> Endpoint {
        Endpoint::new(name, format!("http://{}/{}/", self.addr, name))
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockNetwork {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
