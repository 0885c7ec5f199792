//! Projects domain: the project showcase.

use std::collections::BTreeSet;
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
use crate::types::{Project, ProjectStats, ProjectStatus};
use crate::validate::{self, PayloadValidator};

const ESSENTIAL: &[EndpointType] = &[EndpointType::FeaturedProjects];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectsData {
    pub projects: Vec<Project>,
    pub featured: Vec<Project>,
    pub stats: ProjectStats,
}

impl ProjectsData {
    /// Featured first, then most recently started.
    pub fn sorted(&self) -> Vec<Project> {
        let mut projects = self.projects.clone();
        projects.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| b.start_date.cmp(&a.start_date))
                .then_with(|| a.title.cmp(&b.title))
        });
        projects
    }

    /// Projects using `technology` (case-insensitive).
    pub fn using(&self, technology: &str) -> Vec<&Project> {
        self.projects
            .iter()
            .filter(|p| {
                p.technologies
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(technology))
            })
            .collect()
    }

    pub fn with_status(&self, status: ProjectStatus) -> Vec<&Project> {
        self.projects.iter().filter(|p| p.status == status).collect()
    }

    /// Distinct technologies across all projects, sorted.
    pub fn technologies(&self) -> BTreeSet<String> {
        self.projects
            .iter()
            .flat_map(|p| p.technologies.iter().cloned())
            .collect()
    }
}

pub struct ProjectsService {
    executor: RequestExecutor,
}

impl ProjectsService {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let endpoints = EndpointRegistry::new()
            .with(
                EndpointType::Projects,
                RequestConfig::new(Duration::from_secs(10)).retry_count(2),
            )
            .with(
                EndpointType::FeaturedProjects,
                RequestConfig::new(Duration::from_secs(8))
                    .retry_count(2)
                    .cache_ttl(Duration::from_secs(600)),
            )
            .with(
                EndpointType::ProjectsStats,
                RequestConfig::new(Duration::from_secs(5)).retry_count(1),
            );
        let cache = CacheConfig::new()
            .default_ttl(Duration::from_secs(300))
            .max_cache_size(30)
            .expected_hit_rate(0.75);
        let validator = Arc::new(ProjectsValidator {
            links: ctx.link_base()?,
        });
        Ok(Self {
            executor: ctx.executor(Domain::Projects, endpoints, cache, validator)?,
        })
    }

    pub async fn get_projects(&self) -> Result<Vec<Project>> {
        self.executor.fetch(EndpointType::Projects).await
    }

    pub async fn get_featured_projects(&self) -> Result<Vec<Project>> {
        self.executor.fetch(EndpointType::FeaturedProjects).await
    }

    pub async fn get_project_stats(&self) -> Result<ProjectStats> {
        self.executor.fetch(EndpointType::ProjectsStats).await
    }
}

#[async_trait]
impl DomainService for ProjectsService {
    type Data = ProjectsData;

    fn domain(&self) -> Domain {
        Domain::Projects
    }

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn essential_endpoints(&self) -> &'static [EndpointType] {
        ESSENTIAL
    }

    async fn refresh_all(&self) -> ProjectsData {
        let (projects, featured, stats) = tokio::join!(
            self.get_projects(),
            self.get_featured_projects(),
            self.get_project_stats()
        );
        let data = ProjectsData {
            projects: isolate(projects, Domain::Projects, "get_projects"),
            featured: isolate(featured, Domain::Projects, "get_featured_projects"),
            stats: isolate(stats, Domain::Projects, "get_project_stats"),
        };
        info!(
            service = "projects",
            projects = data.projects.len(),
            featured = data.featured.len(),
            "projects data refreshed"
        );
        data
    }
}

struct ProjectsValidator {
    links: Url,
}

impl ProjectsValidator {
    fn fix_project(&self, r: &mut Map<String, Value>) {
        validate::default_string(r, "title", "Untitled project");
        validate::default_string(r, "description", "");
        validate::string_list(r, "technologies");
        validate::default_bool(r, "featured", false);
        let status = normalise_status(r.get("status"));
        let default_completion = if status == "completed" { 100 } else { 0 };
        r.insert("status".into(), Value::String(status.into()));
        validate::clamp_percent(r, "completion", default_completion);
        for field in ["githubUrl", "liveUrl", "imageUrl"] {
            validate::url_field(r, field, &self.links);
        }
        validate::optional_string(r, "startDate");
        validate::optional_string(r, "endDate");
    }
}

impl PayloadValidator for ProjectsValidator {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        match endpoint {
            EndpointType::Projects | EndpointType::FeaturedProjects => {
                validate::filter_records(data, endpoint, &["id"], |r| self.fix_project(r))
            }
            EndpointType::ProjectsStats => validate::fix_object(data, endpoint, |r| {
                for field in ["total", "featured", "completed", "inProgress", "technologiesUsed"] {
                    validate::non_negative_int(r, field);
                }
            }),
            _ => validate::require_payload(data, endpoint),
        }
    }
}

/// Map the spellings the backend has used onto the status names.
fn normalise_status(raw: Option<&Value>) -> &'static str {
    let Some(Value::String(s)) = raw else {
        return "completed";
    };
    match s.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
        "in-progress" | "inprogress" | "active" | "ongoing" => "in-progress",
        "planned" | "upcoming" => "planned",
        "archived" => "archived",
        _ => "completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> ProjectsValidator {
        ProjectsValidator {
            links: Url::parse("https://example.com/api/").unwrap(),
        }
    }

    #[test]
    fn project_fields_are_normalised() {
        let raw = json!([{
            "id": "p1",
            "status": "In_Progress",
            "completion": 140,
            "technologies": ["Rust", 3, ""],
            "liveUrl": "javascript:alert(1)",
            "imageUrl": "/img/p1.png"
        }]);
        let out = validator()
            .validate_and_transform(raw, EndpointType::Projects)
            .unwrap();
        let projects: Vec<Project> = serde_json::from_value(out).unwrap();
        let p = &projects[0];
        assert_eq!(p.status, ProjectStatus::InProgress);
        assert_eq!(p.completion, 100);
        assert_eq!(p.technologies, vec!["Rust"]);
        assert_eq!(p.live_url, None);
        assert_eq!(p.image_url.as_deref(), Some("https://example.com/img/p1.png"));
        assert_eq!(p.title, "Untitled project");
    }

    #[test]
    fn completion_defaults_follow_status() {
        let raw = json!([{"id": "a"}, {"id": "b", "status": "planned"}]);
        let out = validator()
            .validate_and_transform(raw, EndpointType::FeaturedProjects)
            .unwrap();
        let projects: Vec<Project> = serde_json::from_value(out).unwrap();
        assert_eq!(projects[0].completion, 100);
        assert_eq!(projects[1].completion, 0);
    }

    #[test]
    fn sorted_puts_featured_first() {
        let data = ProjectsData {
            projects: vec![
                Project {
                    id: "old".into(),
                    start_date: Some("2020-01".into()),
                    ..Default::default()
                },
                Project {
                    id: "new".into(),
                    start_date: Some("2024-03".into()),
                    technologies: vec!["Rust".into()],
                    ..Default::default()
                },
                Project {
                    id: "star".into(),
                    featured: true,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let ids: Vec<_> = data.sorted().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["star", "new", "old"]);
        assert_eq!(data.using("rust").len(), 1);
        assert_eq!(data.technologies().len(), 1);
    }
}
