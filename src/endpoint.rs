//! Endpoint identifiers and the static per-endpoint request policy table.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{FolioError, Result};

/// Portfolio data domain. One domain service exists per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Personal,
    Projects,
    Education,
    Skills,
    Technologies,
    Timeline,
    Volunteer,
    Contact,
    Certificates,
}

impl Domain {
    /// Every domain, in snapshot order.
    pub const ALL: [Domain; 9] = [
        Domain::Personal,
        Domain::Projects,
        Domain::Education,
        Domain::Skills,
        Domain::Technologies,
        Domain::Timeline,
        Domain::Volunteer,
        Domain::Contact,
        Domain::Certificates,
    ];

    /// Lowercase name, used as the service label in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Personal => "personal",
            Domain::Projects => "projects",
            Domain::Education => "education",
            Domain::Skills => "skills",
            Domain::Technologies => "technologies",
            Domain::Timeline => "timeline",
            Domain::Volunteer => "volunteer",
            Domain::Contact => "contact",
            Domain::Certificates => "certificates",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FolioError::InvalidInput(format!("unknown domain '{s}'")))
    }
}

/// Identifier for one logical data resource on the backend.
///
/// Used as the key of the [`EndpointRegistry`] and, combined with the route
/// context, of the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointType {
    PersonalInfo,
    Highlights,
    SocialLinks,
    Projects,
    FeaturedProjects,
    ProjectsStats,
    Education,
    EducationStats,
    Skills,
    SkillsStats,
    Technologies,
    TechnologiesStats,
    Timeline,
    Volunteer,
    VolunteerStats,
    ContactInfo,
    Certificates,
    CertificatesStats,
}

impl EndpointType {
    /// Wire identifier, as it appears in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::PersonalInfo => "PERSONAL_INFO",
            EndpointType::Highlights => "HIGHLIGHTS",
            EndpointType::SocialLinks => "SOCIAL_LINKS",
            EndpointType::Projects => "PROJECTS",
            EndpointType::FeaturedProjects => "FEATURED_PROJECTS",
            EndpointType::ProjectsStats => "PROJECTS_STATS",
            EndpointType::Education => "EDUCATION",
            EndpointType::EducationStats => "EDUCATION_STATS",
            EndpointType::Skills => "SKILLS",
            EndpointType::SkillsStats => "SKILLS_STATS",
            EndpointType::Technologies => "TECHNOLOGIES",
            EndpointType::TechnologiesStats => "TECHNOLOGIES_STATS",
            EndpointType::Timeline => "TIMELINE",
            EndpointType::Volunteer => "VOLUNTEER",
            EndpointType::VolunteerStats => "VOLUNTEER_STATS",
            EndpointType::ContactInfo => "CONTACT_INFO",
            EndpointType::Certificates => "CERTIFICATES",
            EndpointType::CertificatesStats => "CERTIFICATES_STATS",
        }
    }

    /// Resource path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            EndpointType::PersonalInfo => "/personal",
            EndpointType::Highlights => "/personal/highlights",
            EndpointType::SocialLinks => "/personal/social-links",
            EndpointType::Projects => "/projects",
            EndpointType::FeaturedProjects => "/projects/featured",
            EndpointType::ProjectsStats => "/projects/stats",
            EndpointType::Education => "/education",
            EndpointType::EducationStats => "/education/stats",
            EndpointType::Skills => "/skills",
            EndpointType::SkillsStats => "/skills/stats",
            EndpointType::Technologies => "/technologies",
            EndpointType::TechnologiesStats => "/technologies/stats",
            EndpointType::Timeline => "/timeline",
            EndpointType::Volunteer => "/volunteer",
            EndpointType::VolunteerStats => "/volunteer/stats",
            EndpointType::ContactInfo => "/contact",
            EndpointType::Certificates => "/certificates",
            EndpointType::CertificatesStats => "/certificates/stats",
        }
    }

    /// Domain that owns this endpoint.
    pub fn domain(&self) -> Domain {
        match self {
            EndpointType::PersonalInfo | EndpointType::Highlights | EndpointType::SocialLinks => {
                Domain::Personal
            }
            EndpointType::Projects
            | EndpointType::FeaturedProjects
            | EndpointType::ProjectsStats => Domain::Projects,
            EndpointType::Education | EndpointType::EducationStats => Domain::Education,
            EndpointType::Skills | EndpointType::SkillsStats => Domain::Skills,
            EndpointType::Technologies | EndpointType::TechnologiesStats => Domain::Technologies,
            EndpointType::Timeline => Domain::Timeline,
            EndpointType::Volunteer | EndpointType::VolunteerStats => Domain::Volunteer,
            EndpointType::ContactInfo => Domain::Contact,
            EndpointType::Certificates | EndpointType::CertificatesStats => Domain::Certificates,
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-endpoint request policy.
///
/// ```rust
/// # use folio::RequestConfig;
/// # use std::time::Duration;
/// let config = RequestConfig::new(Duration::from_secs(8))
///     .retry_count(2)
///     .cache_ttl(Duration::from_secs(600));
/// assert_eq!(config.retry_count, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    /// Hard timeout for a single attempt.
    pub timeout: Duration,
    /// Retries after the initial attempt. 0 = single attempt.
    pub retry_count: u32,
    /// Overrides the service's default TTL when set.
    pub cache_ttl: Option<Duration>,
    /// Skip cache reads for this endpoint.
    pub bypass_cache: bool,
}

impl RequestConfig {
    /// Create a policy with the given timeout, no retries and the service TTL.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            retry_count: 0,
            cache_ttl: None,
            bypass_cache: false,
        }
    }

    /// Set the number of retries after the first attempt.
    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = n;
        self
    }

    /// Override the cache TTL for this endpoint.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Never serve this endpoint from cache.
    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }
}

/// Closed table of the endpoints a service may request.
///
/// Lookups of unregistered endpoints fail fast with
/// [`FolioError::UnknownEndpoint`].
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    configs: HashMap<EndpointType, RequestConfig>,
}

impl EndpointRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the policy for an endpoint.
    pub fn with(mut self, endpoint: EndpointType, config: RequestConfig) -> Self {
        self.configs.insert(endpoint, config);
        self
    }

    /// Look up the policy for an endpoint.
    pub fn get(&self, endpoint: EndpointType) -> Result<&RequestConfig> {
        self.configs
            .get(&endpoint)
            .ok_or(FolioError::UnknownEndpoint(endpoint))
    }

    pub fn contains(&self, endpoint: EndpointType) -> bool {
        self.configs.contains_key(&endpoint)
    }

    /// Registered endpoints, sorted.
    pub fn endpoints(&self) -> Vec<EndpointType> {
        let mut endpoints: Vec<_> = self.configs.keys().copied().collect();
        endpoints.sort();
        endpoints
    }

    /// Apply a timeout to every registered endpoint.
    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        for config in self.configs.values_mut() {
            config.timeout = timeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_endpoint_is_configuration_error() {
        let registry = EndpointRegistry::new().with(
            EndpointType::Skills,
            RequestConfig::new(Duration::from_secs(1)),
        );
        assert!(registry.get(EndpointType::Skills).is_ok());
        assert!(matches!(
            registry.get(EndpointType::Projects),
            Err(FolioError::UnknownEndpoint(EndpointType::Projects))
        ));
    }

    #[test]
    fn display_matches_serde_name() {
        let json = serde_json::to_string(&EndpointType::SkillsStats).unwrap();
        assert_eq!(json, format!("\"{}\"", EndpointType::SkillsStats));
    }

    #[test]
    fn domain_parses_case_insensitively() {
        assert_eq!("Skills".parse::<Domain>().unwrap(), Domain::Skills);
        assert!("blog".parse::<Domain>().is_err());
    }

    #[test]
    fn endpoints_are_sorted() {
        let registry = EndpointRegistry::new()
            .with(EndpointType::SkillsStats, RequestConfig::new(Duration::ZERO))
            .with(EndpointType::Skills, RequestConfig::new(Duration::ZERO));
        assert_eq!(
            registry.endpoints(),
            vec![EndpointType::Skills, EndpointType::SkillsStats]
        );
    }
}
