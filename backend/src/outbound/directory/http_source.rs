//! Reqwest-backed HR directory adapter.
//!
//! This adapter owns transport details only: URL building, bearer
//! authentication, timeout and HTTP error mapping, and JSON decoding. Paging
//! and token validation stay in the domain client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{
    CompaniesResponseDto, GroupsResponseDto, TokenRequestDto, TokenResponseDto, UsersResponseDto,
};
use crate::domain::ports::{
    DirectoryGroup, DirectorySource, DirectorySourceError, DirectoryUsersPage, TokenGrant,
};
use crate::domain::{DirectoryCredentials, OrgInfo};
use crate::outbound::body_preview;

const TOKEN_PATH: &str = "oauth/token";
const COMPANY_PATH: &str = "api/v2/companies/my_company";
const USERS_PATH: &str = "api/v2/users";
const GROUPS_PATH: &str = "api/v2/groups/";

/// Directory adapter issuing requests against one API base URL.
pub struct DirectoryHttpSource {
    client: Client,
    base_url: Url,
}

impl DirectoryHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// Paths are joined onto `base_url`, so a base with a path prefix must end
    /// in `/`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DirectorySourceError> {
        self.base_url.join(path).map_err(|error| {
            DirectorySourceError::transport(format!("invalid directory URL for {path}: {error}"))
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &str,
    ) -> Result<T, DirectorySourceError> {
        send_json(self.client.get(url).bearer_auth(token)).await
    }
}

#[async_trait]
impl DirectorySource for DirectoryHttpSource {
    async fn request_token(
        &self,
        credentials: &DirectoryCredentials,
    ) -> Result<TokenGrant, DirectorySourceError> {
        let mut url = self.endpoint(TOKEN_PATH)?;
        url.query_pairs_mut()
            .append_pair("grant_type", "client_credentials");
        let body = TokenRequestDto {
            client_id: credentials.client_id(),
            client_secret: credentials.client_secret(),
        };
        let decoded: TokenResponseDto = send_json(self.client.post(url).json(&body)).await?;
        Ok(decoded.into())
    }

    async fn fetch_companies(&self, token: &str) -> Result<Vec<OrgInfo>, DirectorySourceError> {
        let url = self.endpoint(COMPANY_PATH)?;
        let decoded: CompaniesResponseDto = self.get_json(url, token).await?;
        Ok(decoded.into_domain())
    }

    async fn fetch_users_page(
        &self,
        token: &str,
        page: u32,
        page_size: u32,
    ) -> Result<DirectoryUsersPage, DirectorySourceError> {
        let mut url = self.endpoint(USERS_PATH)?;
        url.query_pairs_mut()
            .append_pair("page_size", &page_size.to_string())
            .append_pair("page", &page.to_string());
        debug!(page, page_size, "fetching directory users page");
        let decoded: UsersResponseDto = self.get_json(url, token).await?;
        Ok(decoded.into())
    }

    async fn fetch_groups(
        &self,
        token: &str,
        group_id: &str,
    ) -> Result<Vec<DirectoryGroup>, DirectorySourceError> {
        let mut url = self.endpoint(GROUPS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| DirectorySourceError::transport("directory URL cannot carry a path"))?
            .pop_if_empty()
            .push(group_id);
        let decoded: GroupsResponseDto = self.get_json(url, token).await?;
        Ok(decoded.into_domain())
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, DirectorySourceError> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(map_transport_error)?;

    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if status != StatusCode::OK {
        return Err(map_status_error(status, body.as_ref()));
    }
    parse_body(body.as_ref())
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, DirectorySourceError> {
    serde_json::from_slice(body).map_err(|error| {
        DirectorySourceError::decode(format!("invalid directory JSON payload: {error}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> DirectorySourceError {
    if error.is_timeout() {
        DirectorySourceError::timeout(error.to_string())
    } else {
        DirectorySourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> DirectorySourceError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_owned()
    } else {
        preview
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            DirectorySourceError::timeout(format!("status {}: {message}", status.as_u16()))
        }
        _ => DirectorySourceError::status(status.as_u16(), message),
    }
}
