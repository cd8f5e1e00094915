//! # Permissions
//!
//! A permission is one grant: a list of database patterns paired with a set
//! of actions. Both sides must match for the grant to apply.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::actions::{self, Action, ActionPolicy};
use crate::error::RbacResult;
use crate::matcher;

/// A single grant owned by a role.
///
/// Action identifiers are resolved against the catalog when the permission
/// is built, so a `Permission` never holds an unknown action. Deserializing
/// persisted data with an unregistered identifier fails.
///
/// # Example
///
/// ```
/// use dataware_rbac::{Action, Permission};
///
/// let perm = Permission::new(["database1", "test*"], [Action::ReadAll]);
/// assert!(perm.applies_to("testing"));
/// assert!(perm.grants(Action::ReadAll, "database1"));
/// assert!(!perm.grants(Action::Write, "database1"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// Database patterns, in the order they were given.
    pub databases: Vec<String>,
    /// Actions granted on matching databases.
    pub action_ids: BTreeSet<Action>,
}

impl Permission {
    /// Create a permission from already resolved actions.
    pub fn new<D, S, A>(databases: D, actions: A) -> Self
    where
        D: IntoIterator<Item = S>,
        S: Into<String>,
        A: IntoIterator<Item = Action>,
    {
        Self {
            databases: databases.into_iter().map(Into::into).collect(),
            action_ids: actions.into_iter().collect(),
        }
    }

    /// Check if this permission's patterns cover a database id.
    pub fn applies_to(&self, database_id: &str) -> bool {
        matcher::any_matches(database_id, &self.databases)
    }

    /// Check if this permission grants an action under a policy.
    pub fn allows_action(&self, action: Action, policy: ActionPolicy) -> bool {
        match policy {
            ActionPolicy::Exact => self.action_ids.contains(&action),
            ActionPolicy::Hierarchical => self
                .action_ids
                .iter()
                .any(|granted| policy.grants(*granted, action)),
        }
    }

    /// Check if this permission grants `action` on `database_id` using
    /// exact action matching.
    pub fn grants(&self, action: Action, database_id: &str) -> bool {
        self.applies_to(database_id) && self.allows_action(action, ActionPolicy::Exact)
    }

    /// Get every action this permission confers under a policy.
    ///
    /// With [`ActionPolicy::Hierarchical`] the granted set is expanded to
    /// all catalog actions nested under a granted one.
    pub fn effective_actions(&self, policy: ActionPolicy) -> BTreeSet<Action> {
        match policy {
            ActionPolicy::Exact => self.action_ids.clone(),
            ActionPolicy::Hierarchical => Action::all()
                .into_iter()
                .filter(|candidate| self.allows_action(*candidate, policy))
                .collect(),
        }
    }
}

/// Permission as supplied by a caller, before catalog validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PermissionInput {
    /// Database patterns.
    pub databases: Vec<String>,
    /// Raw action identifiers.
    pub action_ids: Vec<String>,
}

impl PermissionInput {
    /// Create a new permission input.
    pub fn new<D, S, A, T>(databases: D, action_ids: A) -> Self
    where
        D: IntoIterator<Item = S>,
        S: Into<String>,
        A: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            databases: databases.into_iter().map(Into::into).collect(),
            action_ids: action_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve the action identifiers against the catalog.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAction` listing each unknown identifier.
    pub fn validate(&self) -> RbacResult<Permission> {
        let actions = actions::resolve_all(&self.action_ids)?;
        Ok(Permission {
            databases: self.databases.clone(),
            action_ids: actions.into_iter().collect(),
        })
    }
}

/// Validate a whole permission list at once.
///
/// Unknown identifiers from every entry are reported together; nothing is
/// returned unless all entries are valid.
///
/// # Errors
///
/// Returns `InvalidAction` listing every unknown identifier across the list.
pub fn validate_all(inputs: &[PermissionInput]) -> RbacResult<Vec<Permission>> {
    let all_ids: Vec<&str> = inputs
        .iter()
        .flat_map(|input| input.action_ids.iter().map(String::as_str))
        .collect();
    actions::resolve_all(&all_ids)?;

    inputs.iter().map(PermissionInput::validate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RbacError;

    #[test]
    fn test_permission_applies_to() {
        let perm = Permission::new(["testpostfix*", "*testprefix", "test?single"], [Action::ReadMetadata]);
        assert!(perm.applies_to("testpostfix123123"));
        assert!(perm.applies_to("123123testprefix"));
        assert!(perm.applies_to("test1single"));
        assert!(!perm.applies_to("testsingle"));
        assert!(!perm.applies_to("unrelated_db"));
    }

    #[test]
    fn test_permission_without_databases_applies_nowhere() {
        let perm = Permission::new(Vec::<String>::new(), [Action::Admin]);
        assert!(!perm.applies_to(""));
        assert!(!perm.grants(Action::Admin, "database1"));
    }

    #[test]
    fn test_exact_action_membership() {
        let perm = Permission::new(["*"], [Action::MetadataWrite]);
        assert!(perm.allows_action(Action::MetadataWrite, ActionPolicy::Exact));
        assert!(!perm.allows_action(Action::MetadataWriteAdd, ActionPolicy::Exact));
        assert!(perm.allows_action(Action::MetadataWriteAdd, ActionPolicy::Hierarchical));
        assert!(!perm.allows_action(Action::MetadataRead, ActionPolicy::Hierarchical));
    }

    #[test]
    fn test_effective_actions_expansion() {
        let perm = Permission::new(["*"], [Action::MetadataWrite, Action::ReadAll]);
        assert_eq!(
            perm.effective_actions(ActionPolicy::Exact),
            BTreeSet::from([Action::MetadataWrite, Action::ReadAll])
        );
        assert_eq!(
            perm.effective_actions(ActionPolicy::Hierarchical),
            BTreeSet::from([
                Action::ReadAll,
                Action::MetadataWrite,
                Action::MetadataWriteAdd,
                Action::MetadataWriteUpdate,
                Action::MetadataWriteDelete,
            ])
        );
    }

    #[test]
    fn test_input_validation() {
        let input = PermissionInput::new(["database1"], ["read_all", "write", "read_all"]);
        let perm = input.validate().unwrap();
        assert_eq!(perm.databases, vec!["database1".to_string()]);
        assert_eq!(perm.action_ids, BTreeSet::from([Action::ReadAll, Action::Write]));

        let bad = PermissionInput::new(["database1"], ["read_all", "teleport"]);
        assert_eq!(
            bad.validate(),
            Err(RbacError::InvalidAction(vec!["teleport".to_string()]))
        );
    }

    #[test]
    fn test_validate_all_collects_across_entries() {
        let inputs = vec![
            PermissionInput::new(["a"], ["read_all", "nope"]),
            PermissionInput::new(["b"], ["write"]),
            PermissionInput::new(["c"], ["also_nope", "nope"]),
        ];
        assert_eq!(
            validate_all(&inputs),
            Err(RbacError::InvalidAction(vec![
                "nope".to_string(),
                "also_nope".to_string()
            ]))
        );

        let valid = validate_all(&inputs[1..2]).unwrap();
        assert_eq!(valid.len(), 1);
        assert!(validate_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_persisted_shape() {
        let json = r#"{"databases": ["database1", "db*"], "action_ids": ["read_all", "metadata:write:add"]}"#;
        let perm: Permission = serde_json::from_str(json).unwrap();
        assert_eq!(perm.databases, vec!["database1".to_string(), "db*".to_string()]);
        assert!(perm.action_ids.contains(&Action::MetadataWriteAdd));

        let back = serde_json::to_value(&perm).unwrap();
        assert_eq!(back["databases"][1], "db*");
        assert_eq!(back["action_ids"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_persisted_shape_rejects_malformed_data() {
        assert!(serde_json::from_str::<Permission>(
            r#"{"databases": ["database1"], "action_ids": ["unknown"]}"#
        )
        .is_err());
        assert!(serde_json::from_str::<Permission>(r#"{"databases": "database1", "action_ids": []}"#).is_err());
        assert!(serde_json::from_str::<Permission>(r#"{"action_ids": []}"#).is_err());
    }
}
