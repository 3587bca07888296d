//! Directory lookup endpoint.
//!
//! ```text
//! GET /user?username=alice
//! X-Caller-User-Id: <id injected by the fronting proxy>
//! ```

use actix_web::{HttpRequest, get, web};
use serde::Serialize;
use url::form_urlencoded;
use utoipa::ToSchema;

use super::caller::require_caller;
use super::{ErrorBody, HttpState};
use crate::domain::{ApiResult, DomainError, ResolvedUser, describe_tenure};

const USERNAME_PARAM: &str = "username";

/// Published record plus derived tenure.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    /// Resolved directory record.
    #[serde(flatten)]
    pub user: ResolvedUser,
    /// Human-readable time since the start date; empty when unknown.
    #[schema(example = "3 years, 2 months")]
    pub tenure: String,
}

/// Empty object returned when nothing matches.
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct NoMatch {}

/// Lookup result: the record, or `{}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum LookupResponse {
    /// The username is published.
    Found(UserResponse),
    /// No such username, or no snapshot yet.
    Missing(NoMatch),
}

/// Look up one user in the published snapshot.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use org_directory::inbound::http::directory::get_user;
///
/// let app = App::new().service(get_user);
/// ```
#[utoipa::path(
    get,
    path = "/user",
    params(
        ("username" = String, Query, description = "Local username; exactly one value"),
        ("X-Caller-User-Id" = String, Header, description = "Authenticated caller id")
    ),
    responses(
        (status = 200, description = "The published record, or an empty object", body = LookupResponse),
        (status = 400, description = "Zero or several usernames given", body = ErrorBody),
        (status = 401, description = "Caller identity header missing", body = ErrorBody)
    ),
    tags = ["directory"],
    operation_id = "getUser"
)]
#[get("/user")]
pub async fn get_user(
    request: HttpRequest,
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<LookupResponse>> {
    require_caller(&request)?;
    let username = single_username(request.query_string())?;

    let response = match state.snapshots.lookup(&username) {
        Some(user) => {
            let today = state.clock.utc().date_naive();
            let tenure = describe_tenure(user.start_date(), today);
            LookupResponse::Found(UserResponse { user, tenure })
        }
        None => LookupResponse::Missing(NoMatch {}),
    };
    Ok(web::Json(response))
}

fn single_username(query: &str) -> ApiResult<String> {
    let mut values = form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == USERNAME_PARAM)
        .map(|(_, value)| value.into_owned());
    match (values.next(), values.next()) {
        (Some(username), None) => Ok(username),
        _ => Err(DomainError::invalid_request("specify exactly one username")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::SnapshotStore;
    use crate::domain::refresh::MockRefreshTrigger;
    use crate::inbound::http::CALLER_ID_HEADER;
    use crate::test_support::{FixedClock, resolved_user};

    fn state(snapshots: Arc<SnapshotStore>) -> web::Data<HttpState> {
        let clock = FixedClock::new(
            Utc.with_ymd_and_hms(2023, 3, 20, 9, 0, 0)
                .single()
                .expect("valid time"),
        );
        web::Data::new(HttpState::new(
            snapshots,
            Arc::new(MockRefreshTrigger::new()),
            Arc::new(clock),
        ))
    }

    fn published() -> Arc<SnapshotStore> {
        let store = Arc::new(SnapshotStore::new());
        store.publish([resolved_user("alice", "1")].into_iter().collect());
        store
    }

    async fn call(
        snapshots: Arc<SnapshotStore>,
        uri: &str,
        caller: Option<&str>,
    ) -> (StatusCode, Value) {
        let app = actix_test::init_service(
            App::new().app_data(state(snapshots)).service(get_user),
        )
        .await;
        let mut request = actix_test::TestRequest::get().uri(uri);
        if let Some(caller) = caller {
            request = request.insert_header((CALLER_ID_HEADER, caller));
        }
        let response = actix_test::call_service(&app, request.to_request()).await;
        let status = response.status();
        let body = actix_test::read_body(response).await;
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    #[rstest]
    #[case::no_header(None)]
    #[case::blank_header(Some("  "))]
    #[actix_web::test]
    async fn rejects_anonymous_callers(#[case] caller: Option<&str>) {
        let (status, body) = call(published(), "/user", caller).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Not authorized" }));
    }

    #[rstest]
    #[case::missing("/user")]
    #[case::repeated("/user?username=alice&username=bob")]
    #[case::other_key("/user?email=alice@co.com")]
    #[actix_web::test]
    async fn requires_exactly_one_username(#[case] uri: &str) {
        let (status, body) = call(published(), uri, Some("caller-1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "specify exactly one username" }));
    }

    #[rstest]
    #[case::unknown_user(published())]
    #[case::before_first_refresh(Arc::new(SnapshotStore::new()))]
    #[actix_web::test]
    async fn misses_render_an_empty_object(#[case] snapshots: Arc<SnapshotStore>) {
        let (status, body) = call(snapshots, "/user?username=carol", Some("caller-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[actix_web::test]
    async fn hits_render_the_record_with_tenure() {
        let (status, body) = call(published(), "/user?username=alice", Some("caller-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "username": "alice",
                "id": "1",
                "email": "alice@co.com",
                "url": "https://co.pingboard.com/users/1",
                "start_year": 2020,
                "start_month": 1,
                "start_day": 15,
                "phone": "",
                "job_title": "",
                "department": "Engineering",
                "manager": "",
                "tenure": "3 years, 2 months",
            })
        );
    }
}
