//! # Authorization Engine
//!
//! Decides what a snapshot of roles allows on a database.
//!
//! Evaluation is default-deny and any-match-wins: a user holds the union of
//! everything any of their roles grants. There is no explicit deny.
//!
//! The engine is stateless apart from its [`ActionPolicy`] and never
//! performs I/O, so one instance can be shared freely across threads.
//! Callers must hand it an owned or otherwise immutable snapshot of the
//! user's roles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::actions::{Action, ActionPolicy};
use crate::roles::Role;

/// Evaluates permission checks against a role snapshot.
///
/// # Example
///
/// ```
/// use dataware_rbac::{Action, Authorizer, Permission, Role, RoleId};
///
/// let roles = vec![Role::new(RoleId(1), "readers")
///     .with_permissions(vec![Permission::new(["db*"], [Action::ReadAll])])];
///
/// let authorizer = Authorizer::new();
/// assert!(authorizer.is_permitted(&roles, Action::ReadAll, "db1"));
/// assert!(!authorizer.is_permitted(&roles, Action::Write, "db1"));
/// assert!(!authorizer.is_permitted(&[], Action::ReadAll, "db1"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Authorizer {
    policy: ActionPolicy,
}

impl Authorizer {
    /// Create an authorizer with exact action matching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an authorizer with a specific action policy.
    pub fn with_policy(policy: ActionPolicy) -> Self {
        Self { policy }
    }

    /// Get the action policy in effect.
    pub fn policy(&self) -> ActionPolicy {
        self.policy
    }

    /// Check if any role grants `action` on `database_id`.
    ///
    /// Permissions whose patterns don't cover the database are skipped
    /// before the action is looked at. No roles means no access.
    pub fn is_permitted(&self, roles: &[Role], action: Action, database_id: &str) -> bool {
        let permitted = roles.iter().any(|role| {
            role.permissions.iter().any(|permission| {
                permission.applies_to(database_id)
                    && permission.allows_action(action, self.policy)
            })
        });

        tracing::trace!(
            action = %action,
            database_id = %database_id,
            roles = roles.len(),
            permitted,
            "Evaluated permission"
        );
        permitted
    }

    /// Collect every action the roles grant on `database_id`.
    ///
    /// Empty when there are no roles or no permission covers the database.
    pub fn permitted_actions(&self, roles: &[Role], database_id: &str) -> BTreeSet<Action> {
        roles
            .iter()
            .flat_map(|role| role.permissions.iter())
            .filter(|permission| permission.applies_to(database_id))
            .flat_map(|permission| permission.effective_actions(self.policy))
            .collect()
    }

    /// Filter candidate databases down to the ones the roles allow.
    ///
    /// With an action, a candidate is kept when that action is permitted on
    /// it. Without one, a candidate is kept when any action is permitted.
    /// Order is preserved and the index of each kept candidate in the input
    /// is reported alongside it.
    pub fn permitted_resources<S: AsRef<str>>(
        &self,
        roles: &[Role],
        action: Option<Action>,
        candidates: &[S],
    ) -> PermittedResources {
        let mut result = PermittedResources::default();

        for (index, candidate) in candidates.iter().enumerate() {
            let candidate = candidate.as_ref();
            let keep = match action {
                Some(action) => self.is_permitted(roles, action, candidate),
                None => roles
                    .iter()
                    .flat_map(|role| role.permissions.iter())
                    .any(|permission| {
                        !permission.action_ids.is_empty() && permission.applies_to(candidate)
                    }),
            };
            if keep {
                result.database_ids.push(candidate.to_string());
                result.selected_indices.push(index);
            }
        }

        result
    }
}

/// Databases selected out of a candidate list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermittedResources {
    /// Permitted database ids, in input order.
    pub database_ids: Vec<String>,
    /// Position of each permitted id in the input.
    pub selected_indices: Vec<usize>,
}

impl PermittedResources {
    /// Get the number of permitted databases.
    pub fn len(&self) -> usize {
        self.database_ids.len()
    }

    /// Check if nothing was permitted.
    pub fn is_empty(&self) -> bool {
        self.database_ids.is_empty()
    }
}
