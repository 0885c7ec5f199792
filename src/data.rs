//! Aggregating facade over the nine domain services.
//!
//! [`DataService`] loads every domain in parallel into one
//! [`PortfolioSnapshot`]. A domain that fails contributes its default data
//! and an [`ErrorStates`] slot; it never holds back the others.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt, StreamMap};
use tracing::{info, warn};

use crate::Result;
use crate::cache::CacheStats;
use crate::endpoint::Domain;
use crate::executor::RequestExecutor;
use crate::services::{
    CertificatesData, CertificatesService, ContactData, ContactService, DomainService,
    EducationData, EducationService, PersonalData, PersonalService, ProjectsData,
    ProjectsService, ServiceContext, SkillsData, SkillsService, TechnologiesData,
    TechnologiesService, TimelineData, TimelineService, VolunteerData, VolunteerService,
};

/// Per-domain loading flag; a domain is loading while any of its
/// endpoints is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadingStates {
    domains: BTreeMap<Domain, bool>,
}

impl LoadingStates {
    /// True when any endpoint of any domain is loading.
    pub fn any(&self) -> bool {
        self.domains.values().any(|&l| l)
    }

    pub fn is_loading(&self, domain: Domain) -> bool {
        self.domains.get(&domain).copied().unwrap_or(false)
    }

    fn set(&mut self, domain: Domain, loading: bool) {
        self.domains.insert(domain, loading);
    }
}

/// One slot per domain: the last failure, or `None` when the domain's
/// latest requests succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorStates {
    domains: BTreeMap<Domain, Option<String>>,
}

impl ErrorStates {
    pub fn get(&self, domain: Domain) -> Option<&str> {
        self.domains.get(&domain).and_then(|e| e.as_deref())
    }

    pub fn has_errors(&self) -> bool {
        self.domains.values().any(Option::is_some)
    }

    /// Domains whose slot is set, in snapshot order.
    pub fn failed(&self) -> Vec<Domain> {
        self.domains
            .iter()
            .filter(|(_, e)| e.is_some())
            .map(|(&d, _)| d)
            .collect()
    }
}

/// Everything the portfolio pages render, replaced wholesale on each load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub personal: PersonalData,
    pub projects: ProjectsData,
    pub education: EducationData,
    pub skills: SkillsData,
    pub technologies: TechnologiesData,
    pub timeline: TimelineData,
    pub volunteer: VolunteerData,
    pub contact: ContactData,
    pub certificates: CertificatesData,
    pub loading: LoadingStates,
    pub errors: ErrorStates,
    /// RFC 3339 time of the last load; `None` before the first.
    pub loaded_at: Option<String>,
}

/// Facade composing every domain service.
///
/// Construction spawns nothing. Expired entries are only dropped by the
/// periodic sweep, so a long-lived host should call
/// [`start_cleanup`](Self::start_cleanup) once inside its runtime.
pub struct DataService {
    personal: Arc<PersonalService>,
    projects: Arc<ProjectsService>,
    education: Arc<EducationService>,
    skills: Arc<SkillsService>,
    technologies: Arc<TechnologiesService>,
    timeline: Arc<TimelineService>,
    volunteer: Arc<VolunteerService>,
    contact: Arc<ContactService>,
    certificates: Arc<CertificatesService>,
    snapshot: RwLock<PortfolioSnapshot>,
}

impl DataService {
    /// Build every domain service from one shared context.
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            personal: Arc::new(PersonalService::new(ctx)?),
            projects: Arc::new(ProjectsService::new(ctx)?),
            education: Arc::new(EducationService::new(ctx)?),
            skills: Arc::new(SkillsService::new(ctx)?),
            technologies: Arc::new(TechnologiesService::new(ctx)?),
            timeline: Arc::new(TimelineService::new(ctx)?),
            volunteer: Arc::new(VolunteerService::new(ctx)?),
            contact: Arc::new(ContactService::new(ctx)?),
            certificates: Arc::new(CertificatesService::new(ctx)?),
            snapshot: RwLock::new(PortfolioSnapshot::default()),
        })
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load every domain in parallel and replace the snapshot.
    pub async fn load_all_data(&self) -> PortfolioSnapshot {
        let (
            personal,
            projects,
            education,
            skills,
            technologies,
            timeline,
            volunteer,
            contact,
            certificates,
        ) = tokio::join!(
            self.personal.refresh_all(),
            self.projects.refresh_all(),
            self.education.refresh_all(),
            self.skills.refresh_all(),
            self.technologies.refresh_all(),
            self.timeline.refresh_all(),
            self.volunteer.refresh_all(),
            self.contact.refresh_all(),
            self.certificates.refresh_all(),
        );
        let snapshot = PortfolioSnapshot {
            personal,
            projects,
            education,
            skills,
            technologies,
            timeline,
            volunteer,
            contact,
            certificates,
            loading: self.loading_states(),
            errors: self.error_states(),
            loaded_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        let failed = snapshot.errors.failed();
        if failed.is_empty() {
            info!("portfolio data loaded");
        } else {
            warn!(?failed, "portfolio data loaded with failed domains");
        }
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        snapshot
    }

    /// Re-fetch one domain, bypassing its cache, and patch the snapshot.
    pub async fn refresh_section(&self, domain: Domain) -> PortfolioSnapshot {
        self.executor(domain).invalidate(None);
        let patch: Box<dyn FnOnce(&mut PortfolioSnapshot) + Send> = match domain {
            Domain::Personal => {
                let data = self.personal.refresh_all().await;
                Box::new(move |s: &mut PortfolioSnapshot| s.personal = data)
            }
            Domain::Projects => {
                let data = self.projects.refresh_all().await;
                Box::new(move |s: &mut PortfolioSnapshot| s.projects = data)
            }
            Domain::Education => {
                let data = self.education.refresh_all().await;
                Box::new(move |s: &mut PortfolioSnapshot| s.education = data)
            }
            Domain::Skills => {
                let data = self.skills.refresh_all().await;
                Box::new(move |s: &mut PortfolioSnapshot| s.skills = data)
            }
            Domain::Technologies => {
                let data = self.technologies.refresh_all().await;
                Box::new(move |s: &mut PortfolioSnapshot| s.technologies = data)
            }
            Domain::Timeline => {
                let data = self.timeline.refresh_all().await;
                Box::new(move |s: &mut PortfolioSnapshot| s.timeline = data)
            }
            Domain::Volunteer => {
                let data = self.volunteer.refresh_all().await;
                Box::new(move |s: &mut PortfolioSnapshot| s.volunteer = data)
            }
            Domain::Contact => {
                let data = self.contact.refresh_all().await;
                Box::new(move |s: &mut PortfolioSnapshot| s.contact = data)
            }
            Domain::Certificates => {
                let data = self.certificates.refresh_all().await;
                Box::new(move |s: &mut PortfolioSnapshot| s.certificates = data)
            }
        };
        let errors = self.error_states();
        info!(%domain, failed = errors.get(domain).is_some(), "section refreshed");

        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        patch(&mut snapshot);
        snapshot.loading = self.loading_states();
        snapshot.errors = errors;
        snapshot.loaded_at = Some(chrono::Utc::now().to_rfc3339());
        snapshot.clone()
    }

    /// Drop every domain's cache and reload everything from the network.
    pub async fn force_refresh_all(&self) -> PortfolioSnapshot {
        let cleared: usize = self
            .executors()
            .iter()
            .map(|(_, executor)| executor.invalidate(None))
            .sum();
        info!(cleared, "all caches cleared, reloading");
        self.load_all_data().await
    }

    // =========================================================================
    // Routing and cache lifecycle
    // =========================================================================

    /// Forward a completed navigation to every service. Returns whether
    /// the route context changed.
    pub fn route_changed(&self, path: &str) -> bool {
        let mut changed = false;
        for (_, executor) in self.executors() {
            changed |= executor.route_changed(path);
        }
        changed
    }

    /// Prefetch every service's essential endpoints.
    pub fn warmup_cache(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        handles.extend(self.personal.warmup_cache());
        handles.extend(self.projects.warmup_cache());
        handles.extend(self.education.warmup_cache());
        handles.extend(self.skills.warmup_cache());
        handles.extend(self.technologies.warmup_cache());
        handles.extend(self.timeline.warmup_cache());
        handles.extend(self.volunteer.warmup_cache());
        handles.extend(self.contact.warmup_cache());
        handles.extend(self.certificates.warmup_cache());
        handles
    }

    /// Start every service's periodic expiry sweep.
    pub fn start_cleanup(&self) -> Vec<JoinHandle<()>> {
        self.executors()
            .iter()
            .map(|(_, executor)| executor.start_cleanup())
            .collect()
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn snapshot(&self) -> PortfolioSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn loading_states(&self) -> LoadingStates {
        let mut states = LoadingStates::default();
        for (domain, executor) in self.executors() {
            states.set(domain, executor.any_loading());
        }
        states
    }

    /// Stream of [`LoadingStates`], updated whenever any service's flags
    /// change.
    pub fn subscribe_loading(&self) -> impl Stream<Item = LoadingStates> + Send + Unpin + 'static {
        let mut streams = StreamMap::new();
        for (domain, executor) in self.executors() {
            streams.insert(domain, executor.subscribe_loading());
        }
        let mut states = self.loading_states();
        streams.map(move |(domain, flags)| {
            states.set(domain, flags.values().any(|&l| l));
            states.clone()
        })
    }

    pub fn error_states(&self) -> ErrorStates {
        let domains = self
            .executors()
            .into_iter()
            .map(|(domain, executor)| {
                let failures = executor.failures();
                let message = (!failures.is_empty()).then(|| {
                    failures
                        .iter()
                        .map(|(endpoint, error)| format!("{endpoint}: {error}"))
                        .collect::<Vec<_>>()
                        .join("; ")
                });
                (domain, message)
            })
            .collect();
        ErrorStates { domains }
    }

    /// Cache diagnostics for every service.
    pub fn cache_stats(&self) -> BTreeMap<Domain, CacheStats> {
        self.executors()
            .into_iter()
            .map(|(domain, executor)| (domain, executor.cache_stats()))
            .collect()
    }

    // =========================================================================
    // Services
    // =========================================================================

    pub fn personal(&self) -> &Arc<PersonalService> {
        &self.personal
    }

    pub fn projects(&self) -> &Arc<ProjectsService> {
        &self.projects
    }

    pub fn education(&self) -> &Arc<EducationService> {
        &self.education
    }

    pub fn skills(&self) -> &Arc<SkillsService> {
        &self.skills
    }

    pub fn technologies(&self) -> &Arc<TechnologiesService> {
        &self.technologies
    }

    pub fn timeline(&self) -> &Arc<TimelineService> {
        &self.timeline
    }

    pub fn volunteer(&self) -> &Arc<VolunteerService> {
        &self.volunteer
    }

    pub fn contact(&self) -> &Arc<ContactService> {
        &self.contact
    }

    pub fn certificates(&self) -> &Arc<CertificatesService> {
        &self.certificates
    }

    /// The executor behind `domain`.
    pub fn executor(&self, domain: Domain) -> &RequestExecutor {
        match domain {
            Domain::Personal => self.personal.executor(),
            Domain::Projects => self.projects.executor(),
            Domain::Education => self.education.executor(),
            Domain::Skills => self.skills.executor(),
            Domain::Technologies => self.technologies.executor(),
            Domain::Timeline => self.timeline.executor(),
            Domain::Volunteer => self.volunteer.executor(),
            Domain::Contact => self.contact.executor(),
            Domain::Certificates => self.certificates.executor(),
        }
    }

    fn executors(&self) -> [(Domain, &RequestExecutor); 9] {
        Domain::ALL.map(|domain| (domain, self.executor(domain)))
    }
}

impl std::fmt::Debug for DataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataService")
            .field("loading", &self.loading_states().any())
            .finish_non_exhaustive()
    }
}
