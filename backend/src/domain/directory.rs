//! Directory records fetched from the HR service and the resolved records
//! published to readers.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

/// Label published when a user's department cannot be resolved.
pub const UNKNOWN_DEPARTMENT: &str = "(unknown department)";

const START_DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar start date split into components.
///
/// Unparsable source values collapse to `0/0/0` instead of failing the cycle.
///
/// # Examples
/// ```
/// use org_directory::domain::StartDate;
///
/// let date = StartDate::parse("2020-01-15");
/// assert_eq!((date.year, date.month, date.day), (2020, 1, 15));
/// assert_eq!(StartDate::parse("last spring"), StartDate::UNKNOWN);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartDate {
    /// Four-digit year, or 0 when unknown.
    pub year: i32,
    /// Month of year (1-12), or 0 when unknown.
    pub month: u32,
    /// Day of month (1-31), or 0 when unknown.
    pub day: u32,
}

impl StartDate {
    /// Placeholder for a missing or malformed start date.
    pub const UNKNOWN: Self = Self {
        year: 0,
        month: 0,
        day: 0,
    };

    /// Parse a `YYYY-MM-DD` value, yielding [`StartDate::UNKNOWN`] on mismatch.
    ///
    /// Surrounding whitespace is ignored, but the date itself must be zero
    /// padded: `2020-1-5` is unknown.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if !is_padded_iso_date(trimmed) {
            return Self::UNKNOWN;
        }
        NaiveDate::parse_from_str(trimmed, START_DATE_FORMAT)
            .map(Self::from)
            .unwrap_or(Self::UNKNOWN)
    }

    /// Whether the source value parsed.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.year != 0
    }

    /// Convert back into a calendar date, if the components form one.
    #[must_use]
    pub fn to_naive_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl From<NaiveDate> for StartDate {
    fn from(value: NaiveDate) -> Self {
        Self {
            year: value.year(),
            month: value.month(),
            day: value.day(),
        }
    }
}

/// One member record as reported by the HR directory.
///
/// Records are scoped to a single refresh cycle and never mutated after the
/// fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Directory-assigned identifier.
    pub id: String,
    /// Email as entered in the directory; not normalized.
    pub email: String,
    /// Office phone.
    pub phone: String,
    /// Job title.
    pub job_title: String,
    /// Parsed start date.
    pub start_date: StartDate,
    /// First department identifier linked to the member, if any.
    pub department_id: Option<String>,
    /// Directory identifier of the member's manager, if any.
    pub manager_id: Option<String>,
}

/// The organization the API credentials belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgInfo {
    /// Display name.
    pub name: String,
    /// Sub-domain used to build profile links.
    pub subdomain: String,
}

impl OrgInfo {
    /// Build the public profile URL of a directory member.
    ///
    /// # Examples
    /// ```
    /// use org_directory::domain::OrgInfo;
    ///
    /// let org = OrgInfo { name: "Co".into(), subdomain: "co".into() };
    /// assert_eq!(org.profile_url("pingboard.com", "42"), "https://co.pingboard.com/users/42");
    /// ```
    #[must_use]
    pub fn profile_url(&self, profile_domain: &str, record_id: &str) -> String {
        format!("https://{}.{profile_domain}/users/{record_id}", self.subdomain)
    }
}

/// Directory record joined to a local identity, as served to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ResolvedUser {
    /// Local username the record is published under.
    #[schema(example = "alice")]
    pub username: String,
    /// Directory identifier.
    #[schema(example = "1")]
    pub id: String,
    /// Email exactly as reported by the directory.
    pub email: String,
    /// Public profile link in the directory.
    pub url: String,
    /// Start year, 0 when unknown.
    pub start_year: i32,
    /// Start month, 0 when unknown.
    pub start_month: u32,
    /// Start day, 0 when unknown.
    pub start_day: u32,
    /// Office phone.
    pub phone: String,
    /// Job title.
    pub job_title: String,
    /// Department name or [`UNKNOWN_DEPARTMENT`].
    pub department: String,
    /// Manager's local username; empty when the manager has no local identity.
    pub manager: String,
}

impl ResolvedUser {
    /// Start date components as a [`StartDate`].
    #[must_use]
    pub const fn start_date(&self) -> StartDate {
        StartDate {
            year: self.start_year,
            month: self.start_month,
            day: self.start_day,
        }
    }
}

/// `true` for exactly ten bytes shaped `DDDD-DD-DD`.
fn is_padded_iso_date(value: &str) -> bool {
    value.len() == 10
        && value.bytes().enumerate().all(|(position, byte)| match position {
            4 | 7 => byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}
