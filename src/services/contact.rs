//! Contact domain: how to reach the portfolio owner.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{DomainService, ServiceContext, isolate};
use crate::Result;
use crate::cache::CacheConfig;
use crate::endpoint::{Domain, EndpointRegistry, EndpointType, RequestConfig};
use crate::executor::RequestExecutor;
use crate::types::ContactInfo;
use crate::validate::{self, PayloadValidator};

const ESSENTIAL: &[EndpointType] = &[EndpointType::ContactInfo];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactData {
    pub info: ContactInfo,
}

impl ContactData {
    /// `mailto:` link, when an address is known.
    pub fn mailto(&self) -> Option<String> {
        let email = self.info.email.trim();
        (!email.is_empty()).then(|| format!("mailto:{email}"))
    }
}

pub struct ContactService {
    executor: RequestExecutor,
}

impl ContactService {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let endpoints = EndpointRegistry::new().with(
            EndpointType::ContactInfo,
            RequestConfig::new(Duration::from_secs(5)).retry_count(2),
        );
        let cache = CacheConfig::new()
            .default_ttl(Duration::from_secs(1800))
            .max_cache_size(5)
            .expected_hit_rate(0.95);
        Ok(Self {
            executor: ctx.executor(Domain::Contact, endpoints, cache, Arc::new(ContactValidator))?,
        })
    }

    pub async fn get_contact_info(&self) -> Result<ContactInfo> {
        self.executor.fetch(EndpointType::ContactInfo).await
    }
}

#[async_trait]
impl DomainService for ContactService {
    type Data = ContactData;

    fn domain(&self) -> Domain {
        Domain::Contact
    }

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    fn essential_endpoints(&self) -> &'static [EndpointType] {
        ESSENTIAL
    }

    async fn refresh_all(&self) -> ContactData {
        let info = isolate(self.get_contact_info().await, Domain::Contact, "get_contact_info");
        info!(service = "contact", has_email = !info.email.is_empty(), "contact data refreshed");
        ContactData { info }
    }
}

struct ContactValidator;

impl PayloadValidator for ContactValidator {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        match endpoint {
            EndpointType::ContactInfo => validate::fix_object(data, endpoint, |r| {
                validate::default_string(r, "email", "");
                validate::optional_string(r, "phone");
                validate::default_string(r, "location", "Remote");
                validate::default_string(r, "availability", "Open to opportunities");
                validate::default_string(r, "preferredContact", "email");
                validate::default_string(r, "responseTime", "Within 24 hours");
            }),
            _ => validate::require_payload(data, endpoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contact_defaults() {
        let out = ContactValidator
            .validate_and_transform(json!({"email": "me@example.com", "phone": ""}), EndpointType::ContactInfo)
            .unwrap();
        let info: ContactInfo = serde_json::from_value(out).unwrap();
        assert_eq!(info.phone, None);
        assert_eq!(info.preferred_contact, "email");
        assert_eq!(info.response_time, "Within 24 hours");

        let data = ContactData { info };
        assert_eq!(data.mailto().as_deref(), Some("mailto:me@example.com"));
    }

    #[test]
    fn null_contact_is_rejected() {
        assert!(
            ContactValidator
                .validate_and_transform(Value::Null, EndpointType::ContactInfo)
                .is_err()
        );
    }
}
