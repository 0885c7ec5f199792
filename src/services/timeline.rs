//! Timeline domain: the career history feed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use super::{DomainService, ServiceContext, isolate};
use crate::Result;
use crate::cache::CacheConfig;
use crate::endpoint::{Domain, EndpointRegistry, EndpointType, RequestConfig};
use crate::executor::RequestExecutor;
use crate::types::{TimelineEvent, TimelineKind};
use crate::validate::{self, PayloadValidator};

const ESSENTIAL: &[EndpointType] = &[EndpointType::Timeline];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineData {
    pub events: Vec<TimelineEvent>,
}

impl TimelineData {
    /// Newest first: current entries lead, then by start date.
    pub fn newest_first(&self) -> Vec<TimelineEvent> {
        let mut events = self.events.clone();
        events.sort_by(|a, b| {
            b.current
                .cmp(&a.current)
                .then_with(|| b.start_date.cmp(&a.start_date))
        });
        events
    }

    pub fn of_kind(&self, kind: TimelineKind) -> Vec<&TimelineEvent> {
        self.events.iter().filter(|e| e.kind == kind).collect()
    }
}

pub struct TimelineService {
    executor: RequestExecutor,
}

impl TimelineService {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let endpoints = EndpointRegistry::new().with(
            EndpointType::Timeline,
            RequestConfig::new(Duration::from_secs(10)).retry_count(2),
        );
        let cache = CacheConfig::new()
            .default_ttl(Duration::from_secs(900))
            .max_cache_size(10)
            .expected_hit_rate(0.9);
        Ok(Self {
            executor: ctx.executor(Domain::Timeline, endpoints, cache, Arc::new(TimelineValidator))?,
        })
    }

    pub async fn get_timeline(&self) -> Result<Vec<TimelineEvent>> {
        self.executor.fetch(EndpointType::Timeline).await
    }
}

#[async_trait]
impl DomainService for TimelineService {
    type Data = TimelineData;

    fn domain(&self) -> Domain {
        Domain::Timeline
    }

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn essential_endpoints(&self) -> &'static [EndpointType] {
        ESSENTIAL
    }

    async fn refresh_all(&self) -> TimelineData {
        let events = isolate(self.get_timeline().await, Domain::Timeline, "get_timeline");
        info!(service = "timeline", events = events.len(), "timeline data refreshed");
        TimelineData { events }
    }
}

struct TimelineValidator;

impl PayloadValidator for TimelineValidator {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        match endpoint {
            EndpointType::Timeline => validate::filter_records(data, endpoint, &["id"], |r| {
                validate::default_string(r, "title", "Untitled");
                validate::default_string(r, "organization", "");
                validate::default_string(r, "description", "");
                validate::default_string(r, "startDate", "");
                validate::optional_string(r, "endDate");
                normalise_kind(r);
                // an event without an end date is ongoing unless told otherwise
                let ongoing = !r.contains_key("endDate");
                validate::default_bool(r, "current", ongoing);
            }),
            _ => validate::require_payload(data, endpoint),
        }
    }
}

/// Accept `kind` or the legacy `type`, lowercase it, and fall back to work.
fn normalise_kind(record: &mut Map<String, Value>) {
    // both spellings go, or serde sees the alias twice
    let legacy = record.remove("type");
    let raw = record
        .remove("kind")
        .or(legacy)
        .and_then(|v| v.as_str().map(str::to_ascii_lowercase));
    let kind = match raw.as_deref() {
        Some("education") => "education",
        Some("project") => "project",
        Some("achievement" | "award") => "achievement",
        _ => "work",
    };
    record.insert("kind".into(), Value::String(kind.into()));
}
