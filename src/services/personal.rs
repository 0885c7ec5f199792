//! Personal domain: profile header, highlights and social links.

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
use crate::types::{Highlight, PersonalInfo, SocialLink};
use crate::validate::{self, PayloadValidator};

const ESSENTIAL: &[EndpointType] = &[EndpointType::PersonalInfo, EndpointType::Highlights];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonalData {
    pub info: PersonalInfo,
    pub highlights: Vec<Highlight>,
    pub social_links: Vec<SocialLink>,
}

impl PersonalData {
    /// Link for `platform`, matched case-insensitively.
    pub fn social_link(&self, platform: &str) -> Option<&SocialLink> {
        self.social_links
            .iter()
            .find(|l| l.platform.eq_ignore_ascii_case(platform))
    }

    /// Initials for the avatar placeholder ("Ada Lovelace" -> "AL").
    pub fn initials(&self) -> String {
        self.info
            .name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect()
    }
}

pub struct PersonalService {
    executor: RequestExecutor,
}

impl PersonalService {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let endpoints = EndpointRegistry::new()
            .with(
                EndpointType::PersonalInfo,
                RequestConfig::new(Duration::from_secs(8)).retry_count(2),
            )
            .with(
                EndpointType::Highlights,
                RequestConfig::new(Duration::from_secs(8)).retry_count(2),
            )
            .with(
                EndpointType::SocialLinks,
                RequestConfig::new(Duration::from_secs(5))
                    .retry_count(1)
                    .cache_ttl(Duration::from_secs(1800)),
            );
        let cache = CacheConfig::new()
            .default_ttl(Duration::from_secs(600))
            .max_cache_size(15)
            .expected_hit_rate(0.9);
        let validator = Arc::new(PersonalValidator {
            links: ctx.link_base()?,
        });
        Ok(Self {
            executor: ctx.executor(Domain::Personal, endpoints, cache, validator)?,
        })
    }

    pub async fn get_personal_info(&self) -> Result<PersonalInfo> {
        self.executor.fetch(EndpointType::PersonalInfo).await
    }

    pub async fn get_highlights(&self) -> Result<Vec<Highlight>> {
        self.executor.fetch(EndpointType::Highlights).await
    }

    pub async fn get_social_links(&self) -> Result<Vec<SocialLink>> {
        self.executor.fetch(EndpointType::SocialLinks).await
    }
}

#[async_trait]
impl DomainService for PersonalService {
    type Data = PersonalData;

    fn domain(&self) -> Domain {
        Domain::Personal
    }

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn essential_endpoints(&self) -> &'static [EndpointType] {
        ESSENTIAL
    }

    async fn refresh_all(&self) -> PersonalData {
        let (info, highlights, social_links) = tokio::join!(
            self.get_personal_info(),
            self.get_highlights(),
            self.get_social_links()
        );
        let data = PersonalData {
            info: isolate(info, Domain::Personal, "get_personal_info"),
            highlights: isolate(highlights, Domain::Personal, "get_highlights"),
            social_links: isolate(social_links, Domain::Personal, "get_social_links"),
        };
        info!(
            service = "personal",
            highlights = data.highlights.len(),
            social_links = data.social_links.len(),
            "personal data refreshed"
        );
        data
    }
}

struct PersonalValidator {
    links: Url,
}

impl PayloadValidator for PersonalValidator {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        match endpoint {
            EndpointType::PersonalInfo => validate::fix_object(data, endpoint, |r| {
                validate::default_string(r, "name", "Anonymous");
                validate::default_string(r, "title", "Software Developer");
                validate::default_string(r, "bio", "");
                validate::default_string(r, "email", "");
                validate::default_string(r, "location", "");
                validate::url_field(r, "avatarUrl", &self.links);
                validate::url_field(r, "resumeUrl", &self.links);
                validate::non_negative_int(r, "yearsOfExperience");
            }),
            EndpointType::Highlights => {
                validate::filter_records(data, endpoint, &["id", "title"], |r| {
                    validate::default_string(r, "description", "");
                    validate::optional_string(r, "icon");
                    validate::optional_string(r, "metric");
                })
            }
            EndpointType::SocialLinks => {
                let links = validate::filter_records(data, endpoint, &["platform", "url"], |r| {
                    validate::url_field(r, "url", &self.links);
                    validate::optional_string(r, "username");
                })?;
                // a link whose URL did not survive sanitising is useless
                Ok(match links {
                    Value::Array(items) => Value::Array(
                        items
                            .into_iter()
                            .filter(|r| r.get("url").is_some_and(Value::is_string))
                            .collect(),
                    ),
                    other => other,
                })
            }
            _ => validate::require_payload(data, endpoint),
        }
    }
}
