//! HTTP feed against a local server that answers with an error status

mod common;

use common::{init_test_logging, serve_status};
use plughub_core::catalog::{GithubRepo, HttpFeed, HubFeed, PluginsCollection};
use plughub_core::config::HubConfig;
use plughub_core::error::HubError;

fn feed_for(base_url: String) -> HttpFeed {
    init_test_logging();

    let config = HubConfig {
        raw_base_url: base_url.clone(),
        api_base_url: base_url,
        timeout_secs: 5,
        ..Default::default()
    };
    HttpFeed::new(config).unwrap()
}

#[test]
fn test_not_found_is_http_status() {
    let feed = feed_for(serve_status("404 Not Found"));

    let err = feed.catalog().unwrap_err();
    match &err {
        HubError::HttpStatus { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("expected HttpStatus, got {other:?}"),
    }
    assert!(!err.is_connectivity());

    assert!(matches!(
        feed.releases(&GithubRepo::new("owner", "repo")),
        Err(HubError::HttpStatus { .. })
    ));
}

#[test]
fn test_connect_propagates_http_status() {
    let feed = feed_for(serve_status("404 Not Found"));

    match PluginsCollection::connect(&feed) {
        Err(HubError::HttpStatus { status, .. }) => assert_eq!(status.as_u16(), 404),
        Err(other) => panic!("expected HttpStatus, got {other:?}"),
        Ok(_) => panic!("a 404 from the hub must not be treated as offline"),
    }
}

#[test]
fn test_server_error_is_not_connectivity() {
    let feed = feed_for(serve_status("503 Service Unavailable"));

    let err = feed.developers().unwrap_err();
    assert!(matches!(err, HubError::HttpStatus { .. }));
    assert!(!err.is_connectivity());
}
