//! Wire shape of the identity service user listing.

use serde::Deserialize;

use crate::domain::ports::LocalIdentity;

#[derive(Debug, Deserialize)]
pub(super) struct IdentityDto {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
}

impl From<IdentityDto> for LocalIdentity {
    fn from(value: IdentityDto) -> Self {
        Self::new(value.username, value.email)
    }
}
