//! # Authorization
//!
//! Every privileged engine operation calls [`authorize`] with the caller's
//! role before doing any work. Visibility of records and users for listing is
//! decided by [`can_view_secret`] and [`can_view_user`].
//!
//! These checks gate what the client attempts. They do not replace the
//! cryptographic boundary: a user without a wrapped DEK cannot decrypt a
//! record no matter what the policy says.

use std::fmt;

use super::user::{Role, UserId, UserIdentity};
use crate::vault::SecretRecord;

/// A privileged action on the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadSecret,
    CreateSecret,
    UpdateSecret,
    DeleteSecret,
    ShareSecret,
    RevokeAccess,
    ListUsers,
    ManageUsers,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ReadSecret => "read secret",
            Operation::CreateSecret => "create secret",
            Operation::UpdateSecret => "update secret",
            Operation::DeleteSecret => "delete secret",
            Operation::ShareSecret => "share secret",
            Operation::RevokeAccess => "revoke access",
            Operation::ListUsers => "list users",
            Operation::ManageUsers => "manage users",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("permission denied: role {role} may not {operation}")]
pub struct PermissionDenied {
    pub role: Role,
    pub operation: Operation,
}

fn allowed(role: Role, operation: Operation) -> bool {
    use Operation::*;
    match operation {
        ReadSecret => true,
        ShareSecret | RevokeAccess | ListUsers => matches!(role, Role::Admin | Role::SuperAdmin),
        CreateSecret | UpdateSecret | DeleteSecret | ManageUsers => role == Role::SuperAdmin,
    }
}

/// Check whether `role` may perform `operation`.
pub fn authorize(role: Role, operation: Operation) -> Result<(), PermissionDenied> {
    if allowed(role, operation) {
        Ok(())
    } else {
        tracing::debug!(%role, %operation, "permission denied");
        Err(PermissionDenied { role, operation })
    }
}

/// Whether a viewer should see `record` when listing.
///
/// Super admins see everything. Admins see records assigned to their team
/// and records they hold an entry for. Users see records they hold an entry
/// for, complete or pending.
pub fn can_view_secret(role: Role, viewer: UserId, team: &str, record: &SecretRecord) -> bool {
    match role {
        Role::SuperAdmin => true,
        Role::Admin => {
            record.acl().contains(viewer) || record.assigned_to_team_ids().iter().any(|t| t == team)
        }
        Role::User => record.acl().contains(viewer),
    }
}

/// Whether a viewer should see `user` when listing users.
pub fn can_view_user(role: Role, viewer: UserId, team: &str, user: &UserIdentity) -> bool {
    match role {
        Role::SuperAdmin => true,
        Role::Admin => user.id == viewer || (user.team == team && user.role == Role::User),
        Role::User => user.id == viewer,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_is_open_to_all() {
        for role in [Role::User, Role::Admin, Role::SuperAdmin] {
            assert!(authorize(role, Operation::ReadSecret).is_ok());
        }
    }

    #[test]
    fn test_share_requires_admin() {
        assert_eq!(
            authorize(Role::User, Operation::ShareSecret),
            Err(PermissionDenied {
                role: Role::User,
                operation: Operation::ShareSecret
            })
        );
        assert!(authorize(Role::Admin, Operation::ShareSecret).is_ok());
        assert!(authorize(Role::SuperAdmin, Operation::RevokeAccess).is_ok());
        assert!(authorize(Role::Admin, Operation::ListUsers).is_ok());
    }

    #[test]
    fn test_mutations_require_super_admin() {
        for op in [
            Operation::CreateSecret,
            Operation::UpdateSecret,
            Operation::DeleteSecret,
            Operation::ManageUsers,
        ] {
            assert!(authorize(Role::User, op).is_err());
            assert!(authorize(Role::Admin, op).is_err());
            assert!(authorize(Role::SuperAdmin, op).is_ok());
        }
    }

    #[test]
    fn test_denied_message() {
        let err = authorize(Role::Admin, Operation::DeleteSecret).unwrap_err();
        assert_eq!(
            err.to_string(),
            "permission denied: role admin may not delete secret"
        );
    }
}
