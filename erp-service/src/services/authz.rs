//! Resolves verified token claims into a principal and applies role and
//! organization-membership rules.

use uuid::Uuid;

use super::database::Database;
use super::error::ServiceError;
use super::jwt::VerifiedClaims;
use crate::models::Role;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

/// Outcome of a role check. A mismatch is an explicit `Forbidden`, never an
/// absent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Authorized(Uuid),
    Forbidden,
}

impl Authorization {
    pub fn into_result(self) -> Result<Uuid, ServiceError> {
        match self {
            Authorization::Authorized(user_id) => Ok(user_id),
            Authorization::Forbidden => Err(ServiceError::Forbidden),
        }
    }
}

/// Look up the token's subject. A subject that is not a user id is an invalid
/// token; a well-formed id with no user behind it is `UserNotFound`; a
/// deactivated user is `Forbidden`.
pub async fn require_any_user(
    db: &Database,
    claims: &VerifiedClaims,
) -> Result<Principal, ServiceError> {
    let user_id = Uuid::parse_str(&claims.subject).map_err(|_| {
        tracing::warn!(sub = %claims.subject, "Token subject is not a user id");
        ServiceError::InvalidToken
    })?;

    let user = db.find_user_by_id(user_id).await?.ok_or_else(|| {
        tracing::warn!(%user_id, "Token subject has no user");
        ServiceError::UserNotFound
    })?;

    if !user.active {
        tracing::warn!(%user_id, "Deactivated user presented a token");
        return Err(ServiceError::Forbidden);
    }

    let role = user
        .role()
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;

    Ok(Principal { user_id, role })
}

pub fn require_role(principal: &Principal, role: Role) -> Authorization {
    if principal.role == role {
        Authorization::Authorized(principal.user_id)
    } else {
        Authorization::Forbidden
    }
}

/// Superuser who is also a member of the organization. Membership is checked
/// before the organization is looked up, so non-members learn nothing about
/// which organizations exist.
pub async fn require_org_superuser(
    db: &Database,
    principal: &Principal,
    organization_id: Uuid,
) -> Result<Uuid, ServiceError> {
    let user_id = require_role(principal, Role::Superuser).into_result()?;

    if !db.is_member(organization_id, user_id).await? {
        tracing::warn!(%user_id, %organization_id, "Superuser is not a member of the organization");
        return Err(ServiceError::Forbidden);
    }

    db.find_organization(organization_id)
        .await?
        .ok_or(ServiceError::NotFound("Organization"))?;

    Ok(user_id)
}
