//! HTTP transport seam.
//!
//! The executor only needs "GET this URL, give me JSON". [`HttpTransport`]
//! captures that so tests can count calls and script failures without a
//! network; [`ReqwestTransport`] is the production implementation.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::route::RouteContext;
use crate::version;
use crate::{FolioError, Result};

/// Header naming the service that issued a request (server-side only).
pub const SERVICE_HEADER: &str = "x-service-name";

/// Header carrying the route context of a request (server-side only).
pub const ROUTE_CONTEXT_HEADER: &str = "x-route-context";

/// One outgoing GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    /// Issuing service name.
    pub service: String,
    pub context: RouteContext,
    /// TTL the response will be cached for.
    pub ttl: Duration,
    /// Rendering on the server; adds caching and diagnostic headers.
    pub ssr: bool,
}

impl ApiRequest {
    /// Headers sent with this request.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("content-type", "application/json".to_string()),
            ("accept", "application/json".to_string()),
        ];
        if self.ssr {
            headers.push((
                "cache-control",
                format!("public, max-age={}", self.ttl.as_secs()),
            ));
            headers.push((SERVICE_HEADER, self.service.clone()));
            headers.push((ROUTE_CONTEXT_HEADER, self.context.to_string()));
        }
        headers
    }
}

/// Issues GET requests and decodes JSON bodies.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the request. Non-2xx statuses are [`FolioError::Api`].
    async fn get(&self, request: &ApiRequest) -> Result<Value>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing client (connection pool, proxies, TLS settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &ApiRequest) -> Result<Value> {
        let mut builder = self
            .client
            .get(&request.url)
            .header("user-agent", version::user_agent());
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FolioError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(ssr: bool) -> ApiRequest {
        ApiRequest {
            url: "http://localhost/api/skills".into(),
            service: "skills".into(),
            context: RouteContext::Skills,
            ttl: Duration::from_secs(600),
            ssr,
        }
    }

    #[test]
    fn browser_requests_send_json_headers_only() {
        let headers = request(false).headers();
        assert_eq!(headers.len(), 2);
        assert!(headers.contains(&("accept", "application/json".into())));
    }

    #[test]
    fn server_requests_add_cache_and_diagnostic_headers() {
        let headers = request(true).headers();
        assert!(headers.contains(&("cache-control", "public, max-age=600".into())));
        assert!(headers.contains(&(SERVICE_HEADER, "skills".into())));
        assert!(headers.contains(&(ROUTE_CONTEXT_HEADER, "skills".into())));
    }
}
