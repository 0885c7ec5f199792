//! Scriptable in-memory transport shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use folio::transport::{ApiRequest, HttpTransport};
use folio::{FolioError, Result};
use serde_json::Value;

pub const BASE_URL: &str = "http://portfolio.test/api";

#[derive(Default)]
struct Route {
    body: Option<Value>,
    failures: VecDeque<FolioError>,
    delay: Duration,
}

/// Serves canned JSON per path, counts calls and can fail on demand.
///
/// Paths are relative to [`BASE_URL`]. Unknown paths answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `path`.
    pub fn route(self, path: &str, body: Value) -> Self {
        self.set_body(path, body);
        self
    }

    pub fn set_body(&self, path: &str, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .body = Some(body);
    }

    /// Fail the next calls to `path` with `errors`, in order.
    pub fn fail_next(&self, path: &str, errors: Vec<FolioError>) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .failures
            .extend(errors);
    }

    /// Delay every response for `path`.
    pub fn set_delay(&self, path: &str, delay: Duration) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .delay = delay;
    }

    /// Number of calls made to `path`.
    pub fn calls(&self, path: &str) -> usize {
        let url = format!("{BASE_URL}{path}");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, request: &ApiRequest) -> Result<Value> {
        self.calls.lock().unwrap().push(request.clone());
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();

        let (delay, outcome) = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&path) {
                Some(route) => {
                    let outcome = match route.failures.pop_front() {
                        Some(err) => Err(err),
                        None => route.body.clone().ok_or(FolioError::Api {
                            status: 404,
                            message: "no body".into(),
                        }),
                    };
                    (route.delay, outcome)
                }
                None => (
                    Duration::ZERO,
                    Err(FolioError::Api {
                        status: 404,
                        message: format!("no route for {path}"),
                    }),
                ),
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

pub fn server_error() -> FolioError {
    FolioError::Api {
        status: 503,
        message: "unavailable".into(),
    }
}
