//! Folio - route-aware caching data layer for a portfolio site
//!
//! Nine domain services (profile, projects, education, skills, technologies,
//! timeline, volunteer work, contact, certificates) fetch JSON from a REST
//! backend through one generic [`RequestExecutor`] each. Executors cache
//! responses under `"<route context>:<endpoint>"` keys with per-endpoint
//! TTLs, coalesce concurrent requests, retry transient failures with capped
//! exponential backoff and always resolve to data or a typed fallback.
//!
//! [`DataService`] aggregates the services into one [`PortfolioSnapshot`]
//! with per-domain loading and error states.
//!
//! # Example
//!
//! ```rust,no_run
//! use folio::{DataService, Domain};
//! use folio::services::ServiceContext;
//!
//! #[tokio::main]
//! async fn main() -> folio::Result<()> {
//!     let data = DataService::new(&ServiceContext::new("https://example.com/api"))?;
//!
//!     data.route_changed("/skills");
//!     let snapshot = data.load_all_data().await;
//!     println!("{} skills", snapshot.skills.skills.len());
//!
//!     if let Some(error) = snapshot.errors.get(Domain::Projects) {
//!         eprintln!("projects unavailable: {error}");
//!         data.refresh_section(Domain::Projects).await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod data;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod lead;
pub mod retry;
pub mod route;
pub mod services;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod validate;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheStats};
pub use config::FolioConfig;
pub use data::{DataService, ErrorStates, LoadingStates, PortfolioSnapshot};
pub use endpoint::{Domain, EndpointRegistry, EndpointType, RequestConfig};
pub use error::{FolioError, Result};
pub use executor::{RequestExecutor, RequestExecutorBuilder};
pub use lead::{EmailJsSender, LeadForm, LeadMessage, MessageSender, SubmissionState};
pub use retry::RetryConfig;
pub use route::{RouteContext, RouteTracker};
pub use services::{DomainService, ServiceContext};
pub use transport::{ApiRequest, HttpTransport, ReqwestTransport};
pub use version::{PKG_VERSION, version_string};
