//! Behaviour of the identity service adapter against a stubbed HTTP server.

use std::time::Duration;

use org_directory::domain::ports::{IdentitySource, IdentitySourceError, LocalIdentity};
use org_directory::domain::{LocalIdentityIndex, NormalizedEmail};
use org_directory::outbound::identity::IdentityHttpSource;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer) -> IdentityHttpSource {
    let base = Url::parse(&server.uri()).expect("mock server uri");
    IdentityHttpSource::new(base, "svc-token", Duration::from_secs(5)).expect("client")
}

async fn mount_page(server: &MockServer, page: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v4/users"))
        .and(query_param("page", page))
        .and(query_param("per_page", "2"))
        .and(header("authorization", "Bearer svc-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_pages_report_more_to_come() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "0",
        json!([
            { "username": "alice", "email": "alice@co.com" },
            { "username": "bob", "email": "bob@co.com" }
        ]),
    )
    .await;

    let page = source_for(&server)
        .list_identities(0, 2)
        .await
        .expect("page should load");

    assert!(page.has_more);
    assert_eq!(
        page.identities,
        vec![
            LocalIdentity::new("alice", "alice@co.com"),
            LocalIdentity::new("bob", "bob@co.com"),
        ]
    );
}

#[tokio::test]
async fn index_walks_every_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "0",
        json!([
            { "username": "alice", "email": "Alice@Co.com" },
            { "username": "bob", "email": "bob@co.com" }
        ]),
    )
    .await;
    mount_page(
        &server,
        "1",
        json!([{ "username": "carol", "email": "carol@co.com" }]),
    )
    .await;

    let index = LocalIdentityIndex::fetch(&source_for(&server), 2)
        .await
        .expect("index should build");

    assert_eq!(index.len(), 3);
    assert_eq!(
        index.username_for(&NormalizedEmail::new("alice@co.com")),
        Some("alice")
    );
    assert_eq!(
        index.username_for(&NormalizedEmail::new("carol@co.com")),
        Some("carol")
    );
}

#[tokio::test]
async fn failures_keep_the_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/users"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let error = source_for(&server)
        .list_identities(0, 2)
        .await
        .expect_err("500 should fail");

    assert_eq!(error, IdentitySourceError::status(500_u16, "status 500"));
}
