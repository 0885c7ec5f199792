//! Skills domain: the skill matrix and its summary figures.

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
use crate::types::{Skill, SkillStats};
use crate::validate::{self, PayloadValidator};

const ESSENTIAL: &[EndpointType] = &[EndpointType::Skills];

/// Level from which a skill counts as expert.
pub const EXPERT_LEVEL: u8 = 80;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkillsData {
    pub skills: Vec<Skill>,
    pub stats: SkillStats,
}

impl SkillsData {
    /// Skills grouped by category, each group strongest first.
    pub fn by_category(&self) -> BTreeMap<String, Vec<Skill>> {
        let mut groups: BTreeMap<String, Vec<Skill>> = BTreeMap::new();
        for skill in &self.skills {
            groups
                .entry(skill.category.clone())
                .or_default()
                .push(skill.clone());
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.name.cmp(&b.name)));
        }
        groups
    }

    /// The `n` highest-level skills.
    pub fn top(&self, n: usize) -> Vec<Skill> {
        let mut skills = self.skills.clone();
        skills.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.name.cmp(&b.name)));
        skills.truncate(n);
        skills
    }

    pub fn experts(&self) -> impl Iterator<Item = &Skill> {
        self.skills.iter().filter(|s| s.level >= EXPERT_LEVEL)
    }
}

pub struct SkillsService {
    executor: RequestExecutor,
}

impl SkillsService {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let endpoints = EndpointRegistry::new()
            .with(
                EndpointType::Skills,
                RequestConfig::new(Duration::from_secs(8)).retry_count(2),
            )
            .with(
                EndpointType::SkillsStats,
                RequestConfig::new(Duration::from_secs(5))
                    .retry_count(1)
                    .cache_ttl(Duration::from_secs(900)),
            );
        let cache = CacheConfig::new()
            .default_ttl(Duration::from_secs(600))
            .max_cache_size(20)
            .expected_hit_rate(0.85);
        let validator = Arc::new(SkillsValidator {
            links: ctx.link_base()?,
        });
        Ok(Self {
            executor: ctx.executor(Domain::Skills, endpoints, cache, validator)?,
        })
    }

    pub async fn get_skills(&self) -> Result<Vec<Skill>> {
        self.executor.fetch(EndpointType::Skills).await
    }

    pub async fn get_skill_stats(&self) -> Result<SkillStats> {
        self.executor.fetch(EndpointType::SkillsStats).await
    }
}

#[async_trait]
impl DomainService for SkillsService {
    type Data = SkillsData;

    fn domain(&self) -> Domain {
        Domain::Skills
    }

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn essential_endpoints(&self) -> &'static [EndpointType] {
        ESSENTIAL
    }

    async fn refresh_all(&self) -> SkillsData {
        let (skills, stats) = tokio::join!(self.get_skills(), self.get_skill_stats());
        let data = SkillsData {
            skills: isolate(skills, Domain::Skills, "get_skills"),
            stats: isolate(stats, Domain::Skills, "get_skill_stats"),
        };
        info!(service = "skills", skills = data.skills.len(), "skills data refreshed");
        data
    }
}

struct SkillsValidator {
    links: Url,
}

impl PayloadValidator for SkillsValidator {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        match endpoint {
            EndpointType::Skills => validate::filter_records(data, endpoint, &["id", "name"], |r| {
                validate::default_string(r, "category", "Other");
                validate::clamp_percent(r, "level", 0);
                validate::clamp_number(r, "yearsOfExperience", 0.0, 60.0, 0.0);
                validate::url_field(r, "icon", &self.links);
            }),
            EndpointType::SkillsStats => validate::fix_object(data, endpoint, |r| {
                validate::non_negative_int(r, "totalSkills");
                validate::non_negative_int(r, "categories");
                validate::non_negative_int(r, "expertCount");
                validate::clamp_number(r, "averageLevel", 0.0, 100.0, 0.0);
            }),
            _ => validate::require_payload(data, endpoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> SkillsValidator {
        SkillsValidator {
            links: Url::parse("http://localhost:3000/api/").unwrap(),
        }
    }

    fn skill(name: &str, category: &str, level: u8) -> Skill {
        Skill {
            id: name.to_lowercase(),
            name: name.into(),
            category: category.into(),
            level,
            ..Default::default()
        }
    }

    #[test]
    fn skills_are_filtered_and_clamped() {
        let raw = json!([
            {"id": 1, "name": "Rust", "level": 150},
            {"id": "2", "name": "Go", "level": -5, "category": "Backend"},
            {"name": "No id", "level": 50}
        ]);
        let out = validator()
            .validate_and_transform(raw, EndpointType::Skills)
            .unwrap();
        let skills: Vec<Skill> = serde_json::from_value(out).unwrap();
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].id, "1");
        assert_eq!(skills[0].level, 100);
        assert_eq!(skills[0].category, "Other");
        assert_eq!(skills[1].level, 0);
    }

    #[test]
    fn stats_average_is_bounded() {
        let out = validator()
            .validate_and_transform(json!({"averageLevel": 180, "totalSkills": "12"}), EndpointType::SkillsStats)
            .unwrap();
        let stats: SkillStats = serde_json::from_value(out).unwrap();
        assert_eq!(stats.average_level, 100.0);
        assert_eq!(stats.total_skills, 12);
    }

    #[test]
    fn null_payload_is_an_error() {
        assert!(
            validator()
                .validate_and_transform(Value::Null, EndpointType::Skills)
                .is_err()
        );
    }

    #[test]
    fn grouping_sorts_strongest_first() {
        let data = SkillsData {
            skills: vec![
                skill("Go", "Backend", 60),
                skill("Rust", "Backend", 90),
                skill("CSS", "Frontend", 70),
            ],
            stats: SkillStats::default(),
        };
        let groups = data.by_category();
        let backend: Vec<_> = groups["Backend"].iter().map(|s| s.name.as_str()).collect();
        assert_eq!(backend, vec!["Rust", "Go"]);
        assert_eq!(data.top(1)[0].name, "Rust");
        assert_eq!(data.experts().count(), 1);
    }
}
