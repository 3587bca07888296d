//! Wire shapes of the HR directory API.

use serde::{Deserialize, Serialize};

use crate::domain::{DirectoryRecord, OrgInfo, StartDate};
use crate::domain::ports::{DirectoryGroup, DirectoryUsersPage, TokenGrant};

/// Body of `POST /oauth/token`.
#[derive(Serialize)]
pub(super) struct TokenRequestDto<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

#[derive(Deserialize)]
pub(super) struct TokenResponseDto {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

impl From<TokenResponseDto> for TokenGrant {
    fn from(value: TokenResponseDto) -> Self {
        Self {
            access_token: value.access_token,
            expires_in_seconds: value.expires_in,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CompaniesResponseDto {
    #[serde(default)]
    companies: Vec<CompanyDto>,
}

#[derive(Debug, Deserialize)]
struct CompanyDto {
    #[serde(default)]
    name: String,
    #[serde(default)]
    subdomain: String,
}

impl CompaniesResponseDto {
    pub fn into_domain(self) -> Vec<OrgInfo> {
        self.companies
            .into_iter()
            .map(|company| OrgInfo {
                name: company.name,
                subdomain: company.subdomain,
            })
            .collect()
    }
}

/// Identifier that may arrive as a JSON number or string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum IdDto {
    Number(i64),
    Text(String),
}

impl IdDto {
    /// `None` for the directory's "no reference" values (`0`, `""`, `"0"`).
    fn into_reference(self) -> Option<String> {
        let id = match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text.trim().to_owned(),
        };
        (!id.is_empty() && id != "0").then_some(id)
    }

    fn into_id(self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UsersResponseDto {
    #[serde(default)]
    users: Vec<UserDto>,
    meta: MetaDto,
}

#[derive(Debug, Deserialize)]
struct MetaDto {
    users: PageMetaDto,
}

#[derive(Debug, Deserialize)]
struct PageMetaDto {
    page: u32,
    page_count: u32,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: IdDto,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    office_phone: Option<String>,
    #[serde(default)]
    job_title: Option<String>,
    #[serde(default)]
    reports_to_id: Option<IdDto>,
    #[serde(default)]
    links: LinksDto,
}

#[derive(Debug, Default, Deserialize)]
struct LinksDto {
    #[serde(default)]
    departments: Vec<IdDto>,
}

impl From<UserDto> for DirectoryRecord {
    fn from(user: UserDto) -> Self {
        Self {
            id: user.id.into_id(),
            email: user.email.unwrap_or_default(),
            phone: user.office_phone.unwrap_or_default(),
            job_title: user.job_title.unwrap_or_default(),
            start_date: StartDate::parse(user.start_date.as_deref().unwrap_or_default()),
            department_id: user
                .links
                .departments
                .into_iter()
                .next()
                .and_then(IdDto::into_reference),
            manager_id: user.reports_to_id.and_then(IdDto::into_reference),
        }
    }
}

impl From<UsersResponseDto> for DirectoryUsersPage {
    fn from(value: UsersResponseDto) -> Self {
        Self {
            records: value.users.into_iter().map(DirectoryRecord::from).collect(),
            page: value.meta.users.page,
            page_count: value.meta.users.page_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GroupsResponseDto {
    #[serde(default)]
    groups: Vec<GroupDto>,
}

#[derive(Debug, Deserialize)]
struct GroupDto {
    id: IdDto,
    #[serde(default)]
    name: String,
}

impl GroupsResponseDto {
    pub fn into_domain(self) -> Vec<DirectoryGroup> {
        self.groups
            .into_iter()
            .map(|group| DirectoryGroup {
                id: group.id.into_id(),
                name: group.name,
            })
            .collect()
    }
}
