//! Behaviour of the HR directory adapter against a stubbed HTTP server.

use std::time::Duration;

use org_directory::domain::ports::{DirectoryGroup, DirectorySource, DirectorySourceError};
use org_directory::domain::{DirectoryCredentials, OrgInfo, StartDate};
use org_directory::outbound::directory::DirectoryHttpSource;
use rstest::rstest;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "tok-123";

fn source_for(server: &MockServer, timeout: Duration) -> DirectoryHttpSource {
    let base = Url::parse(&server.uri()).expect("mock server uri");
    DirectoryHttpSource::new(base, timeout).expect("client should build")
}

#[tokio::test]
async fn exchanges_client_credentials_for_a_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(query_param("grant_type", "client_credentials"))
        .and(body_json(json!({ "client_id": "id", "client_secret": "secret" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": TOKEN, "expires_in": 7200 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let grant = source_for(&server, Duration::from_secs(5))
        .request_token(&DirectoryCredentials::new("id", "secret"))
        .await
        .expect("token exchange should succeed");

    assert_eq!(grant.access_token, TOKEN);
    assert_eq!(grant.expires_in_seconds, 7200);
}

#[tokio::test]
async fn reads_company_users_and_groups_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/companies/my_company"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "companies": [{ "id": "c1", "name": "Co", "subdomain": "co" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "50"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{
                "id": "17",
                "email": "Alice@Co.com",
                "start_date": "2020-01-15",
                "office_phone": "555",
                "job_title": "Eng",
                "reports_to_id": 3,
                "links": { "departments": ["d1"] }
            }],
            "meta": { "users": { "page": 2, "page_count": 4 } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/groups/d1"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "groups": [{ "id": "d1", "name": "Engineering" }]
        })))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5));

    let companies = source.fetch_companies(TOKEN).await.expect("companies");
    assert_eq!(
        companies,
        vec![OrgInfo {
            name: "Co".into(),
            subdomain: "co".into()
        }]
    );

    let page = source
        .fetch_users_page(TOKEN, 2, 50)
        .await
        .expect("users page");
    assert_eq!((page.page, page.page_count), (2, 4));
    let record = page.records.first().expect("one record");
    assert_eq!(record.id, "17");
    assert_eq!(record.start_date, StartDate::parse("2020-01-15"));
    assert_eq!(record.department_id.as_deref(), Some("d1"));
    assert_eq!(record.manager_id.as_deref(), Some("3"));

    let groups = source.fetch_groups(TOKEN, "d1").await.expect("groups");
    assert_eq!(
        groups,
        vec![DirectoryGroup {
            id: "d1".into(),
            name: "Engineering".into()
        }]
    );
}

#[rstest]
#[case::unauthorized(401)]
#[case::forbidden(403)]
#[case::unavailable(503)]
#[tokio::test]
async fn non_ok_statuses_surface_the_status_code(#[case] status: u16) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/companies/my_company"))
        .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
        .mount(&server)
        .await;

    let error = source_for(&server, Duration::from_secs(5))
        .fetch_companies(TOKEN)
        .await
        .expect_err("status should fail");

    assert_eq!(error, DirectorySourceError::status(status, "nope"));
}

#[tokio::test]
async fn malformed_bodies_are_decode_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [] })))
        .mount(&server)
        .await;

    let error = source_for(&server, Duration::from_secs(5))
        .fetch_users_page(TOKEN, 1, 10)
        .await
        .expect_err("missing meta should fail");

    assert!(matches!(error, DirectorySourceError::Decode { .. }), "{error:?}");
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/groups/d1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "groups": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let error = source_for(&server, Duration::from_millis(100))
        .fetch_groups(TOKEN, "d1")
        .await
        .expect_err("request should time out");

    assert!(matches!(error, DirectorySourceError::Timeout { .. }), "{error:?}");
}
