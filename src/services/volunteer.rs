//! Volunteer domain: community work and hours contributed.

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
use crate::types::{VolunteerExperience, VolunteerStats};
use crate::validate::{self, PayloadValidator};

const ESSENTIAL: &[EndpointType] = &[EndpointType::Volunteer];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolunteerData {
    pub experiences: Vec<VolunteerExperience>,
    pub stats: VolunteerStats,
}

impl VolunteerData {
    /// Roles without an end date.
    pub fn active(&self) -> impl Iterator<Item = &VolunteerExperience> {
        self.experiences.iter().filter(|v| v.end_date.is_none())
    }

    /// Hours summed from the records themselves.
    pub fn total_hours(&self) -> u64 {
        self.experiences.iter().map(|v| u64::from(v.hours)).sum()
    }
}

pub struct VolunteerService {
    executor: RequestExecutor,
}

impl VolunteerService {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let endpoints = EndpointRegistry::new()
            .with(
                EndpointType::Volunteer,
                RequestConfig::new(Duration::from_secs(8)).retry_count(2),
            )
            .with(
                EndpointType::VolunteerStats,
                RequestConfig::new(Duration::from_secs(5)).retry_count(1),
            );
        let cache = CacheConfig::new()
            .default_ttl(Duration::from_secs(900))
            .max_cache_size(10)
            .expected_hit_rate(0.9);
        let validator = Arc::new(VolunteerValidator {
            links: ctx.link_base()?,
        });
        Ok(Self {
            executor: ctx.executor(Domain::Volunteer, endpoints, cache, validator)?,
        })
    }

    pub async fn get_volunteer_experience(&self) -> Result<Vec<VolunteerExperience>> {
        self.executor.fetch(EndpointType::Volunteer).await
    }

    pub async fn get_volunteer_stats(&self) -> Result<VolunteerStats> {
        self.executor.fetch(EndpointType::VolunteerStats).await
    }
}

#[async_trait]
impl DomainService for VolunteerService {
    type Data = VolunteerData;

    fn domain(&self) -> Domain {
        Domain::Volunteer
    }

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn essential_endpoints(&self) -> &'static [EndpointType] {
        ESSENTIAL
    }

    async fn refresh_all(&self) -> VolunteerData {
        let (experiences, stats) =
            tokio::join!(self.get_volunteer_experience(), self.get_volunteer_stats());
        let data = VolunteerData {
            experiences: isolate(experiences, Domain::Volunteer, "get_volunteer_experience"),
            stats: isolate(stats, Domain::Volunteer, "get_volunteer_stats"),
        };
        info!(
            service = "volunteer",
            experiences = data.experiences.len(),
            "volunteer data refreshed"
        );
        data
    }
}

struct VolunteerValidator {
    links: Url,
}

impl PayloadValidator for VolunteerValidator {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        match endpoint {
            EndpointType::Volunteer => validate::filter_records(data, endpoint, &["id"], |r| {
                validate::default_string(r, "organization", "Unknown organization");
                validate::default_string(r, "role", "Volunteer");
                validate::default_string(r, "description", "");
                validate::default_string(r, "startDate", "");
                validate::optional_string(r, "endDate");
                validate::non_negative_int(r, "hours");
                validate::url_field(r, "url", &self.links);
            }),
            EndpointType::VolunteerStats => validate::fix_object(data, endpoint, |r| {
                validate::non_negative_int(r, "totalOrganizations");
                validate::non_negative_int(r, "totalHours");
                validate::non_negative_int(r, "activeRoles");
            }),
            _ => validate::require_payload(data, endpoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> VolunteerValidator {
        VolunteerValidator {
            links: Url::parse("http://localhost:3000/api/").unwrap(),
        }
    }

    #[test]
    fn negative_hours_become_zero() {
        let raw = json!([{"id": "v1", "hours": -40}, {"id": "v2", "hours": "120"}]);
        let out = validator()
            .validate_and_transform(raw, EndpointType::Volunteer)
            .unwrap();
        let items: Vec<VolunteerExperience> = serde_json::from_value(out).unwrap();
        assert_eq!(items[0].hours, 0);
        assert_eq!(items[1].hours, 120);
        assert_eq!(items[0].role, "Volunteer");
    }

    #[test]
    fn oversized_hours_keep_the_rest_of_the_list() {
        let raw = json!([{"id": "v1", "hours": 40}, {"id": "v2", "hours": 5_000_000_000u64}]);
        let out = validator()
            .validate_and_transform(raw, EndpointType::Volunteer)
            .unwrap();
        let items: Vec<VolunteerExperience> = serde_json::from_value(out).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].hours, 40);
        assert_eq!(items[1].hours, u32::MAX);

        let out = validator()
            .validate_and_transform(json!({"totalHours": 5_000_000_000u64}), EndpointType::VolunteerStats)
            .unwrap();
        let stats: VolunteerStats = serde_json::from_value(out).unwrap();
        assert_eq!(stats.total_hours, u32::MAX);
    }

    #[test]
    fn stats_from_non_object_default_to_zero() {
        let out = validator()
            .validate_and_transform(json!("oops"), EndpointType::VolunteerStats)
            .unwrap();
        let stats: VolunteerStats = serde_json::from_value(out).unwrap();
        assert_eq!(stats, VolunteerStats::default());
    }

    #[test]
    fn active_roles_and_hours() {
        let data = VolunteerData {
            experiences: vec![
                VolunteerExperience {
                    id: "a".into(),
                    hours: 10,
                    ..Default::default()
                },
                VolunteerExperience {
                    id: "b".into(),
                    hours: 5,
                    end_date: Some("2020-01".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(data.active().count(), 1);
        assert_eq!(data.total_hours(), 15);
    }
}
