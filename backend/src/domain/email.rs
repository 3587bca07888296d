//! Normalized email keys used to join directory records to local identities.
//!
//! Both populations key users by email, but neither agrees on case or on
//! decorative characters. Normalization case-folds the address and keeps only
//! `[a-z0-9@.]`, so `Alice.Smith+hr@Co.com` and `alice.smithhr@co.com` meet
//! on the same key.

use std::fmt;

/// Email address reduced to the cross-system join key.
///
/// # Examples
/// ```
/// use org_directory::domain::NormalizedEmail;
///
/// let key = NormalizedEmail::new("Alice@Co.com");
/// assert_eq!(key.as_str(), "alice@co.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedEmail(String);

impl NormalizedEmail {
    /// Normalize a raw email address.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(normalize_email(raw))
    }

    /// Borrow the normalized key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether normalization left nothing to match on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase `raw` and strip every character outside `[a-z0-9@.]`.
///
/// The function is idempotent: feeding its output back in returns the same
/// string.
///
/// # Examples
/// ```
/// use org_directory::domain::normalize_email;
///
/// assert_eq!(normalize_email(" Bob_O'Neil@Example.ORG "), "boboneil@example.org");
/// ```
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '@' | '.'))
        .collect()
}
