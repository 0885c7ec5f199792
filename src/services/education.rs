//! Education domain: degrees and their summary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use super::{DomainService, ServiceContext, isolate};
use crate::Result;
use crate::cache::CacheConfig;
use crate::endpoint::{Domain, EndpointRegistry, EndpointType, RequestConfig};
use crate::executor::RequestExecutor;
use crate::types::{Education, EducationStats};
use crate::validate::{self, PayloadValidator};

const ESSENTIAL: &[EndpointType] = &[EndpointType::Education];

const MAX_GPA: f64 = 4.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EducationData {
    pub education: Vec<Education>,
    pub stats: EducationStats,
}

impl EducationData {
    /// Ongoing studies first, then by end date, newest first.
    pub fn chronological(&self) -> Vec<Education> {
        let mut items = self.education.clone();
        items.sort_by(|a, b| match (&a.end_date, &b.end_date) {
            (None, None) => b.start_date.cmp(&a.start_date),
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => y.cmp(x),
        });
        items
    }

    pub fn in_progress(&self) -> impl Iterator<Item = &Education> {
        self.education.iter().filter(|e| e.end_date.is_none())
    }
}

pub struct EducationService {
    executor: RequestExecutor,
}

impl EducationService {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let endpoints = EndpointRegistry::new()
            .with(
                EndpointType::Education,
                RequestConfig::new(Duration::from_secs(8)).retry_count(2),
            )
            .with(
                EndpointType::EducationStats,
                RequestConfig::new(Duration::from_secs(5)).retry_count(1),
            );
        let cache = CacheConfig::new()
            .default_ttl(Duration::from_secs(900))
            .max_cache_size(10)
            .expected_hit_rate(0.9);
        let validator = Arc::new(EducationValidator {
            links: ctx.link_base()?,
        });
        Ok(Self {
            executor: ctx.executor(Domain::Education, endpoints, cache, validator)?,
        })
    }

    pub async fn get_education(&self) -> Result<Vec<Education>> {
        self.executor.fetch(EndpointType::Education).await
    }

    pub async fn get_education_stats(&self) -> Result<EducationStats> {
        self.executor.fetch(EndpointType::EducationStats).await
    }
}

#[async_trait]
impl DomainService for EducationService {
    type Data = EducationData;

    fn domain(&self) -> Domain {
        Domain::Education
    }

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn essential_endpoints(&self) -> &'static [EndpointType] {
        ESSENTIAL
    }

    async fn refresh_all(&self) -> EducationData {
        let (education, stats) = tokio::join!(self.get_education(), self.get_education_stats());
        let data = EducationData {
            education: isolate(education, Domain::Education, "get_education"),
            stats: isolate(stats, Domain::Education, "get_education_stats"),
        };
        info!(service = "education", entries = data.education.len(), "education data refreshed");
        data
    }
}

struct EducationValidator {
    links: Url,
}

impl PayloadValidator for EducationValidator {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        match endpoint {
            EndpointType::Education => validate::filter_records(data, endpoint, &["id"], |r| {
                validate::default_string(r, "institution", "Unknown institution");
                validate::default_string(r, "degree", "");
                validate::default_string(r, "field", "");
                validate::default_string(r, "startDate", "");
                validate::optional_string(r, "endDate");
                optional_gpa(r);
                validate::string_list(r, "achievements");
                validate::url_field(r, "logoUrl", &self.links);
            }),
            EndpointType::EducationStats => validate::fix_object(data, endpoint, |r| {
                validate::non_negative_int(r, "totalDegrees");
                validate::non_negative_int(r, "institutions");
                validate::clamp_number(r, "averageGpa", 0.0, MAX_GPA, 0.0);
            }),
            _ => validate::require_payload(data, endpoint),
        }
    }
}

/// Clamp a present GPA to the 4.0 scale; drop one that is not a number.
fn optional_gpa(record: &mut Map<String, Value>) {
    let present = matches!(record.get("gpa"), Some(Value::Number(_)) | Some(Value::String(_)));
    if !present {
        record.remove("gpa");
        return;
    }
    validate::clamp_number(record, "gpa", 0.0, MAX_GPA, f64::NAN);
    if !record.get("gpa").is_some_and(Value::is_number) {
        record.remove("gpa");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> EducationValidator {
        EducationValidator {
            links: Url::parse("http://localhost:3000/api/").unwrap(),
        }
    }

    fn degree(id: &str, start: &str, end: Option<&str>) -> Education {
        Education {
            id: id.into(),
            start_date: start.into(),
            end_date: end.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn gpa_is_clamped_or_dropped() {
        let raw = json!([
            {"id": "a", "gpa": 4.7},
            {"id": "b", "gpa": "3.2"},
            {"id": "c", "gpa": "n/a"},
            {"id": "d"}
        ]);
        let out = validator()
            .validate_and_transform(raw, EndpointType::Education)
            .unwrap();
        let items: Vec<Education> = serde_json::from_value(out).unwrap();
        let gpas: Vec<_> = items.iter().map(|e| e.gpa).collect();
        assert_eq!(gpas, vec![Some(4.0), Some(3.2), None, None]);
        assert_eq!(items[0].institution, "Unknown institution");
    }

    #[test]
    fn chronological_puts_ongoing_first() {
        let data = EducationData {
            education: vec![
                degree("bsc", "2014-09", Some("2017-06")),
                degree("phd", "2021-09", None),
                degree("msc", "2018-09", Some("2020-06")),
            ],
            ..Default::default()
        };
        let ids: Vec<_> = data.chronological().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["phd", "msc", "bsc"]);
        assert_eq!(data.in_progress().count(), 1);
    }
}
