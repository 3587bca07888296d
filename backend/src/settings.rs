//! Service configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `ORG_DIRECTORY_*` environment variables and
//! the configuration file, in OrthoConfig's usual precedence. The directory
//! client secret can additionally be supplied through
//! [`CLIENT_SECRET_OVERRIDE_ENV`], which wins over every other layer.

use std::net::SocketAddr;
use std::time::Duration;

use mockable::Env;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{DirectoryCredentials, SynchronizerConfig};

/// Environment variable overriding the configured client secret.
pub const CLIENT_SECRET_OVERRIDE_ENV: &str = "DIRECTORY_CLIENT_SECRET";

const DEFAULT_DIRECTORY_BASE_URL: &str = "https://app.pingboard.com";
const DEFAULT_PROFILE_DOMAIN: &str = "pingboard.com";
const DEFAULT_IDENTITY_BASE_URL: &str = "http://localhost:8065";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PAGE_SIZE: u32 = 200;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 6 * 60 * 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A URL setting did not parse.
    #[error("invalid URL for {field}='{value}': {source}")]
    InvalidUrl {
        /// Setting name.
        field: &'static str,
        /// Rejected value.
        value: String,
        /// Parser error.
        source: url::ParseError,
    },
    /// The bind address did not parse.
    #[error("invalid bind address '{value}': {source}")]
    InvalidBindAddr {
        /// Rejected value.
        value: String,
        /// Parser error.
        source: std::net::AddrParseError,
    },
    /// A numeric setting was zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Setting name.
        field: &'static str,
    },
}

/// Configuration for the directory service.
///
/// Numeric tuning carries defaults so an empty environment still loads.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ORG_DIRECTORY")]
pub struct DirectorySettings {
    /// OAuth2 client id for the HR directory.
    pub client_id: Option<String>,
    /// OAuth2 client secret for the HR directory.
    pub client_secret: Option<String>,
    /// Base URL of the HR directory API.
    pub directory_base_url: Option<String>,
    /// Domain public profile links are built under.
    pub profile_domain: Option<String>,
    /// Base URL of the local identity service.
    pub identity_base_url: Option<String>,
    /// Bearer token for the local identity service.
    pub identity_token: Option<String>,
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Users requested per directory page.
    #[ortho_config(default = 200)]
    pub page_size: u32,
    /// Seconds between automatic refreshes.
    #[ortho_config(default = 21_600)]
    pub refresh_interval_secs: u64,
    /// Per-request timeout for outbound calls, in seconds.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            directory_base_url: None,
            profile_domain: None,
            identity_base_url: None,
            identity_token: None,
            bind_addr: None,
            page_size: DEFAULT_PAGE_SIZE,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl DirectorySettings {
    /// Effective directory credentials.
    ///
    /// A non-empty [`CLIENT_SECRET_OVERRIDE_ENV`] replaces the configured
    /// secret.
    ///
    /// # Examples
    /// ```
    /// use mockable::MockEnv;
    /// use org_directory::settings::DirectorySettings;
    ///
    /// let mut env = MockEnv::new();
    /// env.expect_string().returning(|_| Some("from-env".to_owned()));
    /// let settings = DirectorySettings {
    ///     client_id: Some("id".into()),
    ///     client_secret: Some("from-file".into()),
    ///     ..DirectorySettings::default()
    /// };
    /// assert_eq!(settings.credentials(&env).client_secret(), "from-env");
    /// ```
    pub fn credentials(&self, env: &impl Env) -> DirectoryCredentials {
        let secret = env
            .string(CLIENT_SECRET_OVERRIDE_ENV)
            .filter(|value| !value.is_empty())
            .or_else(|| self.client_secret.clone())
            .unwrap_or_default();
        DirectoryCredentials::new(self.client_id.clone().unwrap_or_default(), secret)
    }

    /// Parsed HR directory base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value does not parse.
    pub fn directory_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "directory_base_url",
            self.directory_base_url
                .as_deref()
                .unwrap_or(DEFAULT_DIRECTORY_BASE_URL),
        )
    }

    /// Parsed identity service base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value does not parse.
    pub fn identity_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "identity_base_url",
            self.identity_base_url
                .as_deref()
                .unwrap_or(DEFAULT_IDENTITY_BASE_URL),
        )
    }

    /// Identity service token, empty when unset.
    #[must_use]
    pub fn identity_token(&self) -> &str {
        self.identity_token.as_deref().unwrap_or_default()
    }

    /// Parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBindAddr`] when the value does not
    /// parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|source| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
                source,
            })
    }

    /// Timeout applied to each outbound request.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] for a zero timeout.
    pub fn request_timeout(&self) -> Result<Duration, SettingsError> {
        non_zero("request_timeout_secs", self.request_timeout_secs).map(Duration::from_secs)
    }

    /// Refresh tuning derived from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] for a zero page size or interval.
    pub fn synchronizer_config(&self) -> Result<SynchronizerConfig, SettingsError> {
        if self.page_size == 0 {
            return Err(SettingsError::Zero { field: "page_size" });
        }
        let interval = non_zero("refresh_interval_secs", self.refresh_interval_secs)?;
        Ok(SynchronizerConfig {
            page_size: self.page_size,
            identity_page_size: self.page_size,
            refresh_interval: Duration::from_secs(interval),
            profile_domain: self
                .profile_domain
                .clone()
                .unwrap_or_else(|| DEFAULT_PROFILE_DOMAIN.to_owned()),
        })
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, SettingsError> {
    Url::parse(value).map_err(|source| SettingsError::InvalidUrl {
        field,
        value: value.to_owned(),
        source,
    })
}

const fn non_zero(field: &'static str, value: u64) -> Result<u64, SettingsError> {
    if value == 0 {
        Err(SettingsError::Zero { field })
    } else {
        Ok(value)
    }
}
