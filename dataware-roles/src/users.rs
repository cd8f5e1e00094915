//! User records
//!
//! Users come from an external identity provider; this crate only keeps the
//! local record linking a subject id to its roles. A user without a local
//! record simply has no roles.

use dataware_rbac::{Role, RoleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Local record of a user's role assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Identity-provider subject id
    pub id: String,

    /// Display name, if known
    #[serde(default)]
    pub name: String,

    /// Assigned roles
    #[serde(default)]
    pub role_ids: BTreeSet<RoleId>,
}

impl UserRecord {
    /// Create a record with no name and no roles.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            role_ids: BTreeSet::new(),
        }
    }
}

/// A user record with the roles it resolved to, read in one store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAssignment {
    /// The local record
    pub record: UserRecord,
    /// Existing roles among `record.role_ids`, in id order
    pub roles: Vec<Role>,
}

/// Short role reference shown alongside a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleSummary {
    /// Role ID
    pub role_id: RoleId,
    /// Role name
    pub name: String,
    /// Role description
    pub description: String,
}

impl From<&Role> for RoleSummary {
    fn from(role: &Role) -> Self {
        Self {
            role_id: role.id,
            name: role.name.clone(),
            description: role.description.clone(),
        }
    }
}

/// A user together with the roles currently assigned to them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserView {
    /// Identity-provider subject id
    pub user_id: String,
    /// Display name, if known
    pub name: String,
    /// Assigned roles
    pub roles: Vec<RoleSummary>,
}

impl UserView {
    /// Build a view from a record and its resolved roles.
    pub fn new(record: &UserRecord, roles: &[Role]) -> Self {
        Self {
            user_id: record.id.clone(),
            name: record.name.clone(),
            roles: roles.iter().map(RoleSummary::from).collect(),
        }
    }
}

impl From<UserAssignment> for UserView {
    fn from(assignment: UserAssignment) -> Self {
        Self::new(&assignment.record, &assignment.roles)
    }
}
