//! Route-aware caching request executor.
//!
//! One [`RequestExecutor`] backs each domain service. It owns that service's
//! cache store, route tracker and loading flags; nothing is shared between
//! executors.
//!
//! # Request flow
//!
//! 1. Look up the endpoint's [`RequestConfig`]; unknown endpoints fail with
//!    [`FolioError::UnknownEndpoint`].
//! 2. Key the request as `"<route context>:<endpoint>"` and raise the
//!    endpoint's loading flag.
//! 3. Serve a fresh entry if one exists (unless forced or bypassed). Entries
//!    hold a [`Shared`] future, so a caller arriving while the first request
//!    is still in flight joins it instead of issuing another call.
//! 4. Otherwise create the network future (timeout, capped exponential
//!    backoff on transient errors, validation hook), cache it *before* it is
//!    polled, and trim the store to `max_cache_size`.
//! 5. Failures resolve to the caller's fallback (or `T::default()`) and the
//!    entry is dropped so the next call goes back to the network. A payload
//!    that passes validation but not typed deserialisation counts as a
//!    failure too.
//!
//! # Route changes
//!
//! [`RequestExecutor::route_changed`] clears the whole store when the
//! derived context changes. Requests already in flight are not cancelled:
//! their callers still receive the result, and it is written back under
//! the old context's key, where no lookup in the new context finds it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheConfig, CacheStats, CacheStore, cache_key};
use crate::endpoint::{EndpointRegistry, EndpointType, RequestConfig};
use crate::retry::{RetryConfig, with_retry};
use crate::route::{RouteContext, RouteTracker};
use crate::telemetry;
use crate::transport::{ApiRequest, HttpTransport, ReqwestTransport};
use crate::validate::{PassThrough, PayloadValidator};
use crate::{FolioError, Result};

/// Outcome of one network call as seen by every coalesced caller.
type Payload = std::result::Result<Arc<Value>, String>;

/// Cache entry payload: a cloneable handle on the in-flight or settled call.
type SharedPayload = Shared<BoxFuture<'static, Payload>>;

/// What a caller awaits, and where its result belongs.
struct Dispatch {
    payload: SharedPayload,
    key: String,
    context: RouteContext,
    ttl: Duration,
    created: Instant,
}

/// Loading flag per endpoint.
pub type LoadingFlags = BTreeMap<EndpointType, bool>;

/// Default API base used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

struct State {
    store: CacheStore<SharedPayload>,
    route: RouteTracker,
    failures: BTreeMap<EndpointType, String>,
}

struct Inner {
    service: String,
    transport: Arc<dyn HttpTransport>,
    validator: Arc<dyn PayloadValidator>,
    endpoints: EndpointRegistry,
    cache_config: CacheConfig,
    retry: RetryConfig,
    base_url: String,
    ssr: bool,
    state: Mutex<State>,
    loading: watch::Sender<LoadingFlags>,
}

/// Caching, coalescing, retrying executor for one domain service.
///
/// Cheap to clone; clones share the same cache and state.
#[derive(Clone)]
pub struct RequestExecutor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("service", &self.inner.service)
            .field("base_url", &self.inner.base_url)
            .field("endpoints", &self.inner.endpoints.endpoints())
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Start configuring an executor for `service`.
    pub fn builder(service: impl Into<String>) -> RequestExecutorBuilder {
        RequestExecutorBuilder::new(service)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Fetch `url` for `endpoint`, through the cache.
    ///
    /// Resolves to the validated payload, or to `fallback` (else
    /// `T::default()`) when the call cannot be satisfied. The only error is
    /// [`FolioError::UnknownEndpoint`].
    pub async fn request<T>(
        &self,
        endpoint: EndpointType,
        url: &str,
        fallback: Option<T>,
        force_refresh: bool,
    ) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let config = self.inner.endpoints.get(endpoint)?.clone();
        self.set_loading(endpoint, true);

        let dispatch = self.lookup_or_dispatch(endpoint, url, &config, force_refresh);
        let outcome = dispatch.payload.clone().await;
        self.set_loading(endpoint, false);

        match outcome {
            Ok(value) => match T::deserialize(value.as_ref()) {
                Ok(data) => {
                    self.settle_success(endpoint, &dispatch);
                    return Ok(data);
                }
                Err(e) => {
                    warn!(
                        service = %self.inner.service,
                        %endpoint,
                        error = %e,
                        "payload does not match the expected shape, using fallback"
                    );
                    self.settle_failure(
                        endpoint,
                        &dispatch,
                        format!("payload does not match the expected shape: {e}"),
                    );
                }
            },
            Err(message) => self.settle_failure(endpoint, &dispatch, message),
        }

        metrics::counter!(telemetry::FALLBACKS_TOTAL,
            "service" => self.inner.service.clone(),
            "endpoint" => endpoint.as_str(),
        )
        .increment(1);
        Ok(fallback.unwrap_or_default())
    }

    /// Clear the endpoint's failure and write back a result orphaned by a
    /// route change.
    ///
    /// The write-back lands under the old context's key, which no lookup in
    /// the new context addresses; sweep or eviction removes it later.
    fn settle_success(&self, endpoint: EndpointType, dispatch: &Dispatch) {
        let mut state = self.state();
        state.failures.remove(&endpoint);
        if dispatch.context == state.route.context() || state.store.contains_key(&dispatch.key) {
            return;
        }
        state.store.insert(
            dispatch.key.clone(),
            dispatch.payload.clone(),
            dispatch.ttl,
            dispatch.created,
        );
        state.store.maintain_size(self.inner.cache_config.max_cache_size);
        debug!(service = %self.inner.service, key = %dispatch.key, "orphaned response cached under its old context");
    }

    /// Drop the entry if it still holds this dispatch's future, and record
    /// the failure for the endpoint.
    fn settle_failure(&self, endpoint: EndpointType, dispatch: &Dispatch, message: String) {
        let mut state = self.state();
        if let Some(id) = state
            .store
            .entry(&dispatch.key)
            .filter(|e| e.data.ptr_eq(&dispatch.payload))
            .map(|e| e.id)
        {
            state.store.remove_if(&dispatch.key, id);
        }
        state.failures.insert(endpoint, message);
    }

    /// [`request`](Self::request) against the endpoint's own URL with the
    /// type's default as fallback.
    pub async fn fetch<T>(&self, endpoint: EndpointType) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        self.request(endpoint, &self.url_for(endpoint), None, false)
            .await
    }

    /// Full URL of an endpoint under the configured base.
    pub fn url_for(&self, endpoint: EndpointType) -> String {
        format!(
            "{}{}",
            self.inner.base_url.trim_end_matches('/'),
            endpoint.path()
        )
    }

    /// Serve a fresh entry or create and cache the network future.
    fn lookup_or_dispatch(
        &self,
        endpoint: EndpointType,
        url: &str,
        config: &RequestConfig,
        force_refresh: bool,
    ) -> Dispatch {
        let now = Instant::now();
        let mut state = self.state();
        let context = state.route.context();
        let key = cache_key(context, endpoint);

        if !force_refresh && !config.bypass_cache {
            if let Some(shared) = state.store.get_fresh(&key, now) {
                let created = state.store.entry(&key).map_or(now, |e| e.timestamp);
                drop(state);
                metrics::counter!(telemetry::CACHE_HITS_TOTAL,
                    "service" => self.inner.service.clone(),
                    "endpoint" => endpoint.as_str(),
                )
                .increment(1);
                debug!(service = %self.inner.service, %key, "cache hit");
                self.set_loading(endpoint, false);
                let ttl = entry_ttl(config, &self.inner.cache_config);
                return Dispatch {
                    payload: shared,
                    key,
                    context,
                    ttl,
                    created,
                };
            }
        }

        metrics::counter!(telemetry::CACHE_MISSES_TOTAL,
            "service" => self.inner.service.clone(),
            "endpoint" => endpoint.as_str(),
        )
        .increment(1);

        let ttl = entry_ttl(config, &self.inner.cache_config);
        let request = ApiRequest {
            url: url.to_string(),
            service: self.inner.service.clone(),
            context,
            ttl,
            ssr: self.inner.ssr,
        };
        let shared = self.network_call(endpoint, request, config.clone()).shared();
        state.store.insert(key.clone(), shared.clone(), ttl, now);
        debug!(service = %self.inner.service, %key, ttl_ms = ttl.as_millis() as u64, "cache miss, request dispatched");

        let evicted = state.store.maintain_size(self.inner.cache_config.max_cache_size);
        drop(state);
        if !evicted.is_empty() {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL,
                "service" => self.inner.service.clone(),
                "reason" => "size",
            )
            .increment(evicted.len() as u64);
            debug!(service = %self.inner.service, ?evicted, "evicted oldest entries");
        }

        Dispatch {
            payload: shared,
            key,
            context,
            ttl,
            created: now,
        }
    }

    /// Build the (not yet polled) network future for one request.
    fn network_call(
        &self,
        endpoint: EndpointType,
        request: ApiRequest,
        config: RequestConfig,
    ) -> BoxFuture<'static, Payload> {
        let transport = Arc::clone(&self.inner.transport);
        let validator = Arc::clone(&self.inner.validator);
        let retry = self.inner.retry.clone();

        async move {
            let started = Instant::now();
            let result = with_retry(&retry, config.retry_count, &request.service, endpoint, || {
                attempt(transport.as_ref(), &request, config.timeout)
            })
            .await
            .and_then(|raw| validator.validate_and_transform(raw, endpoint));

            metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
                "service" => request.service.clone(),
                "endpoint" => endpoint.as_str(),
            )
            .record(started.elapsed().as_secs_f64());

            let status = if result.is_ok() { "ok" } else { "fallback" };
            metrics::counter!(telemetry::REQUESTS_TOTAL,
                "service" => request.service.clone(),
                "endpoint" => endpoint.as_str(),
                "status" => status,
            )
            .increment(1);

            result.map(Arc::new).map_err(|e| {
                log_failure(&request, endpoint, &e);
                e.to_string()
            })
        }
        .boxed()
    }

    // =========================================================================
    // Route tracking
    // =========================================================================

    /// Notify the executor of a completed navigation.
    ///
    /// When the derived context differs from the current one the whole
    /// store is cleared and every loading flag is reset. Returns whether
    /// that happened.
    pub fn route_changed(&self, path: &str) -> bool {
        let mut state = self.state();
        let Some(previous) = state.route.navigate(path) else {
            return false;
        };
        let cleared = state.store.clear();
        let current = state.route.context();
        drop(state);

        self.inner.loading.send_if_modified(|flags| {
            let mut changed = false;
            for flag in flags.values_mut() {
                changed |= std::mem::replace(flag, false);
            }
            changed
        });
        info!(
            service = %self.inner.service,
            from = %previous,
            to = %current,
            cleared,
            "route context changed, cache cleared"
        );
        true
    }

    pub fn route_context(&self) -> RouteContext {
        self.state().route.context()
    }

    pub fn current_route(&self) -> String {
        self.state().route.current_route().to_string()
    }

    // =========================================================================
    // Invalidation and maintenance
    // =========================================================================

    /// Drop the current route's entry for `endpoint` (and the bare legacy
    /// key), or everything when `endpoint` is `None`.
    pub fn invalidate(&self, endpoint: Option<EndpointType>) -> usize {
        let mut state = self.state();
        let removed = match endpoint {
            Some(endpoint) => {
                let context = state.route.context();
                state.store.invalidate_endpoint(context, endpoint)
            }
            None => state.store.clear(),
        };
        debug!(service = %self.inner.service, ?endpoint, removed, "cache invalidated");
        removed
    }

    /// Drop every entry keyed under `context`.
    pub fn invalidate_for_route(&self, context: RouteContext) -> usize {
        let removed = self.state().store.invalidate_route(context);
        debug!(service = %self.inner.service, %context, removed, "route cache invalidated");
        removed
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let removed = self.state().store.sweep(Instant::now());
        if removed > 0 {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL,
                "service" => self.inner.service.clone(),
                "reason" => "expired",
            )
            .increment(removed as u64);
            debug!(service = %self.inner.service, removed, "expired entries swept");
        }
        removed
    }

    /// Spawn the periodic expiry sweep.
    ///
    /// The task holds only a weak reference and ends once every clone of
    /// the executor is dropped. Abort the handle to stop it earlier.
    pub fn start_cleanup(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self
            .inner
            .cache_config
            .cleanup_interval
            .max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                RequestExecutor { inner }.sweep();
            }
        })
    }

    /// Issue fire-and-forget requests for `endpoints` to pre-populate the
    /// cache. No-op when prefetch is disabled.
    pub fn prefetch(&self, endpoints: &[EndpointType]) -> Vec<JoinHandle<()>> {
        if !self.inner.cache_config.enable_prefetch {
            return Vec::new();
        }
        let delay = self.inner.cache_config.prefetch_delay;
        endpoints
            .iter()
            .map(|&endpoint| {
                let executor = self.clone();
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let url = executor.url_for(endpoint);
                    if let Err(e) = executor
                        .request::<Value>(endpoint, &url, None, false)
                        .await
                    {
                        warn!(service = %executor.inner.service, %endpoint, error = %e, "prefetch failed");
                    }
                })
            })
            .collect()
    }

    /// Diagnostic view of the store; no side effects.
    pub fn cache_stats(&self) -> CacheStats {
        let state = self.state();
        let config = &self.inner.cache_config;
        state.store.stats(
            state.route.context(),
            config.avg_entry_size,
            config.expected_hit_rate,
        )
    }

    // =========================================================================
    // Loading and failure state
    // =========================================================================

    pub fn is_loading(&self, endpoint: EndpointType) -> bool {
        self.inner
            .loading
            .borrow()
            .get(&endpoint)
            .copied()
            .unwrap_or(false)
    }

    pub fn any_loading(&self) -> bool {
        self.inner.loading.borrow().values().any(|&l| l)
    }

    pub fn loading_flags(&self) -> LoadingFlags {
        self.inner.loading.borrow().clone()
    }

    /// Stream of loading flags, starting with the current value.
    pub fn subscribe_loading(&self) -> WatchStream<LoadingFlags> {
        WatchStream::new(self.inner.loading.subscribe())
    }

    /// Last failure message per endpoint; cleared by the next success.
    pub fn failures(&self) -> BTreeMap<EndpointType, String> {
        self.state().failures.clone()
    }

    fn set_loading(&self, endpoint: EndpointType, loading: bool) {
        self.inner
            .loading
            .send_if_modified(|flags| flags.insert(endpoint, loading) != Some(loading));
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.inner.cache_config
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.inner.endpoints
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // State is consistent after every statement, so a poisoned lock is safe to reuse.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn entry_ttl(config: &RequestConfig, cache: &CacheConfig) -> Duration {
    config.cache_ttl.unwrap_or(cache.default_ttl)
}

/// One attempt: the transport call bounded by the endpoint timeout.
async fn attempt(
    transport: &dyn HttpTransport,
    request: &ApiRequest,
    timeout: Duration,
) -> Result<Value> {
    match tokio::time::timeout(timeout, transport.get(request)).await {
        Ok(result) => result,
        Err(_) => Err(FolioError::Timeout(timeout)),
    }
}

fn log_failure(request: &ApiRequest, endpoint: EndpointType, err: &FolioError) {
    error!(
        service = %request.service,
        %endpoint,
        route_context = %request.context,
        status = err.status(),
        retryable = err.is_transient(),
        url = %request.url,
        timestamp = %chrono::Utc::now().to_rfc3339(),
        error = %err,
        "request failed, resolving to fallback"
    );
}

/// Builder for [`RequestExecutor`].
pub struct RequestExecutorBuilder {
    service: String,
    transport: Option<Arc<dyn HttpTransport>>,
    validator: Arc<dyn PayloadValidator>,
    endpoints: EndpointRegistry,
    cache_config: CacheConfig,
    retry: RetryConfig,
    base_url: String,
    ssr: bool,
}

impl RequestExecutorBuilder {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            transport: None,
            validator: Arc::new(PassThrough),
            endpoints: EndpointRegistry::new(),
            cache_config: CacheConfig::default(),
            retry: RetryConfig::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            ssr: false,
        }
    }

    /// Use a custom transport (default: [`ReqwestTransport`]).
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn PayloadValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn endpoints(mut self, endpoints: EndpointRegistry) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Mark requests as server-side rendered (adds caching headers).
    pub fn ssr(mut self, enabled: bool) -> Self {
        self.ssr = enabled;
        self
    }

    /// Build the executor.
    ///
    /// Fails with [`FolioError::Configuration`] for an unparsable base URL.
    pub fn build(self) -> Result<RequestExecutor> {
        Url::parse(&self.base_url).map_err(|e| {
            FolioError::Configuration(format!("invalid base URL '{}': {e}", self.base_url))
        })?;

        let flags: LoadingFlags = self
            .endpoints
            .endpoints()
            .into_iter()
            .map(|e| (e, false))
            .collect();
        let (loading, _) = watch::channel(flags);

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

        Ok(RequestExecutor {
            inner: Arc::new(Inner {
                service: self.service,
                transport,
                validator: self.validator,
                endpoints: self.endpoints,
                cache_config: self.cache_config,
                retry: self.retry,
                base_url: self.base_url,
                ssr: self.ssr,
                state: Mutex::new(State {
                    store: CacheStore::new(),
                    route: RouteTracker::new(),
                    failures: BTreeMap::new(),
                }),
                loading,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> RequestExecutor {
        RequestExecutor::builder("test")
            .base_url("http://localhost:3000/api/")
            .endpoints(EndpointRegistry::new().with(
                EndpointType::Skills,
                RequestConfig::new(Duration::from_secs(1)),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn url_for_joins_base_and_path() {
        assert_eq!(
            executor().url_for(EndpointType::SkillsStats),
            "http://localhost:3000/api/skills/stats"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = RequestExecutor::builder("test").base_url("not a url").build();
        assert!(matches!(result, Err(FolioError::Configuration(_))));
    }

    #[test]
    fn loading_flags_start_false_for_registered_endpoints() {
        let executor = executor();
        assert_eq!(
            executor.loading_flags(),
            LoadingFlags::from([(EndpointType::Skills, false)])
        );
        assert!(!executor.any_loading());
    }

    #[test]
    fn same_context_navigation_keeps_route_state() {
        let executor = executor();
        assert!(executor.route_changed("/projects"));
        assert!(!executor.route_changed("/projects/42"));
        assert_eq!(executor.route_context(), RouteContext::Projects);
        assert_eq!(executor.current_route(), "/projects/42");
    }
}
