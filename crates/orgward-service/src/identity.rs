//! Request identity resolution: bearer header to active organization
//! user.

use orgward_core::error::{OrgwardError, OrgwardResult};
use orgward_core::models::user::OrganizationUser;
use orgward_core::repository::UserRepository;

use crate::error::TokenError;
use crate::token::{parse_bearer, Authenticator};

/// Resolves `Authorization` headers into [`OrganizationUser`] values.
///
/// Generic over the authenticator and the user store so the HTTP layer
/// never touches either directly.
pub struct IdentityService<A: Authenticator, U: UserRepository> {
    authenticator: A,
    users: U,
}

impl<A: Authenticator, U: UserRepository> IdentityService<A, U> {
    pub fn new(authenticator: A, users: U) -> Self {
        Self { authenticator, users }
    }

    /// Verify the header, look up the bound user, and require the user
    /// to be Active. Any failure along the way is `Unauthorized`; the
    /// caller learns nothing about which step rejected.
    pub async fn resolve(&self, header: Option<&str>) -> OrgwardResult<OrganizationUser> {
        let header = header.ok_or(TokenError::Missing)?;
        let token = parse_bearer(header)?;
        let subject = self.authenticator.verify(token)?;

        let user = self
            .users
            .get_by_credential(&subject.idp_type, &subject.credential)
            .await
            .map_err(|_| OrgwardError::Unauthorized)?;

        if !user.is_active() {
            return Err(OrgwardError::Unauthorized);
        }

        Ok(user)
    }
}
