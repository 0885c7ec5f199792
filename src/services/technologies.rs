//! Technologies domain: the tool and framework stack.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{DomainService, ServiceContext, isolate};
use crate::Result;
use crate::cache::CacheConfig;
use crate::endpoint::{Domain, EndpointRegistry, EndpointType, RequestConfig};
use crate::executor::RequestExecutor;
use crate::types::{Technology, TechnologyStats};
use crate::validate::{self, PayloadValidator};

const ESSENTIAL: &[EndpointType] = &[EndpointType::Technologies];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TechnologiesData {
    pub technologies: Vec<Technology>,
    pub stats: TechnologyStats,
}

impl TechnologiesData {
    /// Technologies grouped by category, alphabetical within a group.
    pub fn by_category(&self) -> BTreeMap<String, Vec<Technology>> {
        let mut groups: BTreeMap<String, Vec<Technology>> = BTreeMap::new();
        for tech in &self.technologies {
            groups
                .entry(tech.category.clone())
                .or_default()
                .push(tech.clone());
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        }
        groups
    }

    /// Technologies at or above `min` proficiency, strongest first.
    pub fn proficient(&self, min: u8) -> Vec<&Technology> {
        let mut techs: Vec<_> = self
            .technologies
            .iter()
            .filter(|t| t.proficiency >= min)
            .collect();
        techs.sort_by(|a, b| b.proficiency.cmp(&a.proficiency));
        techs
    }
}

pub struct TechnologiesService {
    executor: RequestExecutor,
}

impl TechnologiesService {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let endpoints = EndpointRegistry::new()
            .with(
                EndpointType::Technologies,
                RequestConfig::new(Duration::from_secs(8)).retry_count(2),
            )
            .with(
                EndpointType::TechnologiesStats,
                RequestConfig::new(Duration::from_secs(5))
                    .retry_count(1)
                    .cache_ttl(Duration::from_secs(900)),
            );
        let cache = CacheConfig::new()
            .default_ttl(Duration::from_secs(600))
            .max_cache_size(20)
            .expected_hit_rate(0.85);
        let validator = Arc::new(TechnologiesValidator {
            links: ctx.link_base()?,
        });
        Ok(Self {
            executor: ctx.executor(Domain::Technologies, endpoints, cache, validator)?,
        })
    }

    pub async fn get_technologies(&self) -> Result<Vec<Technology>> {
        self.executor.fetch(EndpointType::Technologies).await
    }

    pub async fn get_technology_stats(&self) -> Result<TechnologyStats> {
        self.executor.fetch(EndpointType::TechnologiesStats).await
    }
}

#[async_trait]
impl DomainService for TechnologiesService {
    type Data = TechnologiesData;

    fn domain(&self) -> Domain {
        Domain::Technologies
    }

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn essential_endpoints(&self) -> &'static [EndpointType] {
        ESSENTIAL
    }

    async fn refresh_all(&self) -> TechnologiesData {
        let (technologies, stats) =
            tokio::join!(self.get_technologies(), self.get_technology_stats());
        let data = TechnologiesData {
            technologies: isolate(technologies, Domain::Technologies, "get_technologies"),
            stats: isolate(stats, Domain::Technologies, "get_technology_stats"),
        };
        info!(
            service = "technologies",
            technologies = data.technologies.len(),
            "technologies data refreshed"
        );
        data
    }
}

struct TechnologiesValidator {
    links: Url,
}

impl PayloadValidator for TechnologiesValidator {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        match endpoint {
            EndpointType::Technologies => {
                validate::filter_records(data, endpoint, &["id", "name"], |r| {
                    validate::default_string(r, "category", "Other");
                    validate::clamp_percent(r, "proficiency", 0);
                    validate::url_field(r, "iconUrl", &self.links);
                    validate::url_field(r, "websiteUrl", &self.links);
                })
            }
            EndpointType::TechnologiesStats => validate::fix_object(data, endpoint, |r| {
                validate::non_negative_int(r, "total");
                validate::non_negative_int(r, "categories");
                validate::clamp_number(r, "averageProficiency", 0.0, 100.0, 0.0);
            }),
            _ => validate::require_payload(data, endpoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> TechnologiesValidator {
        TechnologiesValidator {
            links: Url::parse("http://localhost:3000/api/").unwrap(),
        }
    }

    #[test]
    fn proficiency_and_links_are_sanitised() {
        let raw = json!([{
            "id": "t1",
            "name": "PostgreSQL",
            "proficiency": 101,
            "iconUrl": "icons/pg.svg",
            "websiteUrl": "mailto:someone@example.com"
        }]);
        let out = validator()
            .validate_and_transform(raw, EndpointType::Technologies)
            .unwrap();
        let techs: Vec<Technology> = serde_json::from_value(out).unwrap();
        assert_eq!(techs[0].proficiency, 100);
        assert_eq!(techs[0].category, "Other");
        assert_eq!(
            techs[0].icon_url.as_deref(),
            Some("http://localhost:3000/api/icons/pg.svg")
        );
        assert_eq!(techs[0].website_url, None);
    }

    #[test]
    fn grouping_and_proficiency_filter() {
        let tech = |name: &str, category: &str, proficiency: u8| Technology {
            id: name.into(),
            name: name.into(),
            category: category.into(),
            proficiency,
            ..Default::default()
        };
        let data = TechnologiesData {
            technologies: vec![
                tech("tokio", "Rust", 90),
                tech("Axum", "Rust", 70),
                tech("Docker", "DevOps", 60),
            ],
            ..Default::default()
        };
        let rust: Vec<_> = data.by_category()["Rust"]
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(rust, vec!["Axum", "tokio"]);
        let names: Vec<_> = data.proficient(70).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["tokio", "Axum"]);
    }
}
