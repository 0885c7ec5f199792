//! Configuration files feeding the data layer.

use std::io::Write;
use std::time::Duration;

use folio::{DataService, Domain, EndpointType, FolioConfig, FolioError};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn explicit_path_is_loaded() {
    let file = write_config(
        r#"
        [api]
        base_url = "https://portfolio.example.com/api"

        [cache]
        enable_prefetch = false
        "#,
    );

    let config = FolioConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.api.base_url, "https://portfolio.example.com/api");
    assert_eq!(config.cache.enable_prefetch, Some(false));
    assert_eq!(config.retry.initial_delay_ms, 1000);
}

#[test]
fn parse_errors_name_the_file() {
    let file = write_config("[api\n");
    let err = FolioConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, FolioError::Configuration(_)));
    let path = file.path().to_string_lossy().into_owned();
    assert!(err.to_string().contains(&path), "{err}");
}

#[tokio::test]
async fn service_context_applies_overrides() {
    let config = FolioConfig::parse(
        r#"
        [api]
        base_url = "https://portfolio.example.com/api"
        ssr = true
        timeout_ms = 1500

        [cache]
        max_cache_size = 4
        cleanup_interval_secs = 30
        "#,
    )
    .unwrap();

    let data = DataService::new(&config.service_context()).unwrap();

    for domain in Domain::ALL {
        let executor = data.executor(domain);
        assert_eq!(executor.base_url(), "https://portfolio.example.com/api");
        assert_eq!(executor.cache_config().max_cache_size, 4);
        assert_eq!(executor.cache_config().cleanup_interval, Duration::from_secs(30));
    }

    let skills = data.executor(Domain::Skills).endpoints();
    assert_eq!(
        skills.get(EndpointType::Skills).unwrap().timeout,
        Duration::from_millis(1500)
    );
    // TTLs are a service concern and survive the override
    assert_eq!(
        data.executor(Domain::Personal)
            .endpoints()
            .get(EndpointType::SocialLinks)
            .unwrap()
            .cache_ttl,
        Some(Duration::from_secs(1800))
    );
}

#[tokio::test]
async fn default_config_keeps_service_policies() {
    let data = DataService::new(&FolioConfig::default().service_context()).unwrap();

    let contact = data.executor(Domain::Contact);
    assert_eq!(contact.base_url(), "http://localhost:3000/api");
    assert_eq!(contact.cache_config().max_cache_size, 5);
    assert_eq!(contact.cache_config().default_ttl, Duration::from_secs(1800));
    assert!(contact.cache_config().enable_prefetch);
}
