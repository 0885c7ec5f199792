//! Domain services.
//!
//! Each service binds one [`RequestExecutor`] to a portfolio domain: its
//! endpoint table, cache policy, payload validator and typed operations.
//! Services are thin compositions; all caching and retry behaviour lives
//! in the executor.

mod certificates;
mod contact;
mod education;
mod personal;
mod projects;
mod skills;
mod technologies;
mod timeline;
mod volunteer;

pub use certificates::{CertificatesData, CertificatesService};
pub use contact::{ContactData, ContactService};
pub use education::{EducationData, EducationService};
pub use personal::{PersonalData, PersonalService};
pub use projects::{ProjectsData, ProjectsService};
pub use skills::{SkillsData, SkillsService};
pub use technologies::{TechnologiesData, TechnologiesService};
pub use timeline::{TimelineData, TimelineService};
pub use volunteer::{VolunteerData, VolunteerService};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::cache::CacheConfig;
use crate::endpoint::{Domain, EndpointRegistry, EndpointType};
use crate::executor::{DEFAULT_BASE_URL, RequestExecutor};
use crate::retry::RetryConfig;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::validate::PayloadValidator;
use crate::{FolioError, Result};

/// Behaviour shared by every domain service.
#[async_trait]
pub trait DomainService: Send + Sync {
    /// Everything the domain contributes to the portfolio snapshot.
    type Data: Clone + Default + Send + Serialize;

    fn domain(&self) -> Domain;

    fn executor(&self) -> &RequestExecutor;

    /// Endpoints worth loading before first render.
    fn essential_endpoints(&self) -> &'static [EndpointType];

    /// Fetch every resource of the domain in parallel.
    ///
    /// A failing resource contributes its default value and a warning;
    /// it never prevents the others from loading.
    async fn refresh_all(&self) -> Self::Data;

    /// Pre-populate the cache with the essential endpoints,
    /// fire-and-forget. No-op when prefetch is disabled.
    fn warmup_cache(&self) -> Vec<JoinHandle<()>> {
        self.executor().prefetch(self.essential_endpoints())
    }
}

/// Overrides applied on top of every service's own cache policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheOverrides {
    pub max_cache_size: Option<usize>,
    pub cleanup_interval: Option<Duration>,
    pub enable_prefetch: Option<bool>,
}

impl CacheOverrides {
    fn apply(&self, mut config: CacheConfig) -> CacheConfig {
        if let Some(n) = self.max_cache_size {
            config.max_cache_size = n;
        }
        if let Some(interval) = self.cleanup_interval {
            config.cleanup_interval = interval;
        }
        if let Some(enabled) = self.enable_prefetch {
            config.enable_prefetch = enabled;
        }
        config
    }
}

/// Settings shared by every service: transport, API base, backoff curve.
///
/// ```rust
/// # use folio::services::ServiceContext;
/// let ctx = ServiceContext::new("https://api.example.com/v1").ssr(true);
/// assert_eq!(ctx.base_url(), "https://api.example.com/v1");
/// ```
#[derive(Clone)]
pub struct ServiceContext {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    retry: RetryConfig,
    ssr: bool,
    timeout: Option<Duration>,
    cache: CacheOverrides,
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ServiceContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            transport: Arc::new(ReqwestTransport::new()),
            base_url: base_url.into(),
            retry: RetryConfig::default(),
            ssr: false,
            timeout: None,
            cache: CacheOverrides::default(),
        }
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn ssr(mut self, enabled: bool) -> Self {
        self.ssr = enabled;
        self
    }

    /// Replace every endpoint's timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cache_overrides(mut self, overrides: CacheOverrides) -> Self {
        self.cache = overrides;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL with a trailing slash, for resolving relative links.
    pub(crate) fn link_base(&self) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base).map_err(|e| {
            FolioError::Configuration(format!("invalid base URL '{}': {e}", self.base_url))
        })
    }

    /// Build the executor for one domain.
    pub(crate) fn executor(
        &self,
        domain: Domain,
        mut endpoints: EndpointRegistry,
        cache: CacheConfig,
        validator: Arc<dyn PayloadValidator>,
    ) -> Result<RequestExecutor> {
        if let Some(timeout) = self.timeout {
            endpoints.set_timeout(timeout);
        }
        RequestExecutor::builder(domain.as_str())
            .transport(Arc::clone(&self.transport))
            .validator(validator)
            .endpoints(endpoints)
            .cache(self.cache.apply(cache))
            .retry(self.retry.clone())
            .base_url(self.base_url.clone())
            .ssr(self.ssr)
            .build()
    }
}

/// Unwrap one resource result inside a `refresh_all` fan-out.
pub(crate) fn isolate<T: Default>(result: Result<T>, domain: Domain, operation: &str) -> T {
    result.unwrap_or_else(|e| {
        warn!(service = %domain, operation, error = %e, "resource failed, using default");
        T::default()
    })
}
