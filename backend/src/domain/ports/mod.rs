//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod directory_source;
mod identity_source;

#[cfg(test)]
pub use directory_source::MockDirectorySource;
pub use directory_source::{
    DirectoryGroup, DirectorySource, DirectorySourceError, DirectoryUsersPage, TokenGrant,
};
#[cfg(test)]
pub use identity_source::MockIdentitySource;
pub use identity_source::{
    FixtureIdentitySource, IdentityPage, IdentitySource, IdentitySourceError, LocalIdentity,
};
