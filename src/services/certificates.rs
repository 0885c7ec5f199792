//! Certificates domain: professional certifications.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{DomainService, ServiceContext, isolate};
use crate::Result;
use crate::cache::CacheConfig;
use crate::endpoint::{Domain, EndpointRegistry, EndpointType, RequestConfig};
use crate::executor::RequestExecutor;
use crate::types::{Certificate, CertificateStats};
use crate::validate::{self, PayloadValidator};

const ESSENTIAL: &[EndpointType] = &[EndpointType::Certificates];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CertificatesData {
    pub certificates: Vec<Certificate>,
    pub stats: CertificateStats,
}

impl CertificatesData {
    /// Certificates not expired on `today`, most recently issued first.
    pub fn active_on(&self, today: NaiveDate) -> Vec<&Certificate> {
        let mut active: Vec<_> = self
            .certificates
            .iter()
            .filter(|c| !is_expired(c, today))
            .collect();
        active.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));
        active
    }

    /// [`active_on`](Self::active_on) for the current UTC date.
    pub fn active(&self) -> Vec<&Certificate> {
        self.active_on(Utc::now().date_naive())
    }

    pub fn issuers(&self) -> BTreeSet<&str> {
        self.certificates.iter().map(|c| c.issuer.as_str()).collect()
    }
}

/// Expired when the expiry date is strictly before `today`.
///
/// Missing or unparsable expiry dates never expire.
pub fn is_expired(certificate: &Certificate, today: NaiveDate) -> bool {
    certificate
        .expiry_date
        .as_deref()
        .and_then(parse_date)
        .is_some_and(|expiry| expiry < today)
}

/// Parse `YYYY-MM-DD`, or `YYYY-MM` as the first of the month.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .ok()
}

pub struct CertificatesService {
    executor: RequestExecutor,
}

impl CertificatesService {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let endpoints = EndpointRegistry::new()
            .with(
                EndpointType::Certificates,
                RequestConfig::new(Duration::from_secs(8)).retry_count(2),
            )
            .with(
                EndpointType::CertificatesStats,
                RequestConfig::new(Duration::from_secs(5)).retry_count(1),
            );
        let cache = CacheConfig::new()
            .default_ttl(Duration::from_secs(900))
            .max_cache_size(10)
            .expected_hit_rate(0.9);
        let validator = Arc::new(CertificatesValidator {
            links: ctx.link_base()?,
        });
        Ok(Self {
            executor: ctx.executor(Domain::Certificates, endpoints, cache, validator)?,
        })
    }

    pub async fn get_certificates(&self) -> Result<Vec<Certificate>> {
        self.executor.fetch(EndpointType::Certificates).await
    }

    pub async fn get_certificate_stats(&self) -> Result<CertificateStats> {
        self.executor.fetch(EndpointType::CertificatesStats).await
    }
}

#[async_trait]
impl DomainService for CertificatesService {
    type Data = CertificatesData;

    fn domain(&self) -> Domain {
        Domain::Certificates
    }

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn essential_endpoints(&self) -> &'static [EndpointType] {
        ESSENTIAL
    }

    async fn refresh_all(&self) -> CertificatesData {
        let (certificates, stats) =
            tokio::join!(self.get_certificates(), self.get_certificate_stats());
        let data = CertificatesData {
            certificates: isolate(certificates, Domain::Certificates, "get_certificates"),
            stats: isolate(stats, Domain::Certificates, "get_certificate_stats"),
        };
        info!(
            service = "certificates",
            certificates = data.certificates.len(),
            "certificates data refreshed"
        );
        data
    }
}

struct CertificatesValidator {
    links: Url,
}

impl PayloadValidator for CertificatesValidator {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        match endpoint {
            EndpointType::Certificates => {
                validate::filter_records(data, endpoint, &["id", "name"], |r| {
                    validate::default_string(r, "issuer", "Unknown issuer");
                    validate::default_string(r, "issueDate", "");
                    validate::optional_string(r, "expiryDate");
                    validate::optional_string(r, "credentialId");
                    validate::url_field(r, "credentialUrl", &self.links);
                    validate::string_list(r, "skills");
                })
            }
            EndpointType::CertificatesStats => validate::fix_object(data, endpoint, |r| {
                for field in ["total", "active", "expired", "issuers"] {
                    validate::non_negative_int(r, field);
                }
            }),
            _ => validate::require_payload(data, endpoint),
        }
    }
}
