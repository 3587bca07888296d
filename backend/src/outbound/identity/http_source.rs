//! Reqwest-backed identity service adapter.
//!
//! Lists accounts through `GET /api/v4/users` with zero-based paging. The
//! service returns a bare JSON array; a short page marks the end.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use zeroize::Zeroizing;

use super::dto::IdentityDto;
use crate::domain::ports::{IdentityPage, IdentitySource, IdentitySourceError, LocalIdentity};
use crate::outbound::body_preview;

const USERS_PATH: &str = "api/v4/users";

/// Identity adapter bound to one service base URL.
pub struct IdentityHttpSource {
    client: Client,
    base_url: Url,
    token: Zeroizing<String>,
}

impl IdentityHttpSource {
    /// Build an adapter; an empty `token` sends unauthenticated requests.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token: Zeroizing::new(token.to_owned()),
        })
    }
}

#[async_trait]
impl IdentitySource for IdentityHttpSource {
    async fn list_identities(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<IdentityPage, IdentitySourceError> {
        let mut url = self.base_url.join(USERS_PATH).map_err(|error| {
            IdentitySourceError::transport(format!("invalid identity service URL: {error}"))
        })?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &page_size.to_string());

        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if !self.token.is_empty() {
            request = request.bearer_auth(self.token.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|error| IdentitySourceError::transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| IdentitySourceError::transport(error.to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let identities = parse_identities(body.as_ref())?;
        let full_page = usize::try_from(page_size).unwrap_or(usize::MAX);
        let has_more = page_size > 0 && identities.len() >= full_page;
        Ok(IdentityPage {
            identities,
            has_more,
        })
    }
}

fn parse_identities(body: &[u8]) -> Result<Vec<LocalIdentity>, IdentitySourceError> {
    let decoded: Vec<IdentityDto> = serde_json::from_slice(body).map_err(|error| {
        IdentitySourceError::decode(format!("invalid identity JSON payload: {error}"))
    })?;
    Ok(decoded.into_iter().map(LocalIdentity::from).collect())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> IdentitySourceError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        preview
    };
    IdentitySourceError::status(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_listing_and_ignores_extra_fields() {
        let identities = parse_identities(
            br#"[
                {"id": "u1", "username": "alice", "email": "alice@co.com", "roles": "system_user"},
                {"username": "bot"}
            ]"#,
        )
        .expect("listing should decode");
        assert_eq!(
            identities,
            vec![
                LocalIdentity::new("alice", "alice@co.com"),
                LocalIdentity::new("bot", ""),
            ]
        );
    }

    #[test]
    fn object_body_is_a_decode_error() {
        let error = parse_identities(br#"{"users": []}"#).expect_err("decode should fail");
        assert!(matches!(error, IdentitySourceError::Decode { .. }));
    }

    #[test]
    fn status_errors_keep_code_and_preview() {
        assert_eq!(
            map_status_error(StatusCode::UNAUTHORIZED, b"{\"message\": \"expired\"}"),
            IdentitySourceError::status(401_u16, "{\"message\": \"expired\"}")
        );
        assert_eq!(
            map_status_error(StatusCode::BAD_GATEWAY, b""),
            IdentitySourceError::status(502_u16, "status 502")
        );
    }
}
