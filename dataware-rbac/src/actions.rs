//! # Actions
//!
//! The action catalog: every capability a permission can grant.
//!
//! The catalog is a closed set fixed at compile time. Identifiers may be
//! colon-segmented (`metadata:write:add`), which places an action under its
//! ancestors (`metadata:write`, `metadata`). Whether a grant for an ancestor
//! also covers its descendants is decided by [`ActionPolicy`].

use serde::{Deserialize, Serialize};

use crate::error::{RbacError, RbacResult};

/// Separator between segments of a hierarchical action identifier.
pub const SEGMENT_SEPARATOR: char = ':';

/// Actions that can be granted on databases.
///
/// Variants are declared in catalog order; [`Action::all`] and
/// [`list_all`] preserve it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// Full administrative access.
    #[serde(rename = "admin")]
    Admin,

    /// Read records flagged as public.
    #[serde(rename = "read_only_public")]
    ReadOnlyPublic,

    /// Read every record.
    #[serde(rename = "read_all")]
    ReadAll,

    /// Read metadata records.
    #[serde(rename = "read_metadata")]
    ReadMetadata,

    /// Read fields marked as private keys.
    #[serde(rename = "read_private_keys")]
    ReadPrivateKeys,

    /// Write records.
    #[serde(rename = "write")]
    Write,

    /// Every metadata operation.
    #[serde(rename = "metadata")]
    Metadata,

    /// Read metadata.
    #[serde(rename = "metadata:read")]
    MetadataRead,

    /// Every metadata write operation.
    #[serde(rename = "metadata:write")]
    MetadataWrite,

    /// Add metadata records.
    #[serde(rename = "metadata:write:add")]
    MetadataWriteAdd,

    /// Update metadata records.
    #[serde(rename = "metadata:write:update")]
    MetadataWriteUpdate,

    /// Delete metadata records.
    #[serde(rename = "metadata:write:delete")]
    MetadataWriteDelete,

    /// Every file operation.
    #[serde(rename = "file")]
    File,

    /// Download files.
    #[serde(rename = "file:read")]
    FileRead,

    /// Upload or replace files.
    #[serde(rename = "file:write")]
    FileWrite,
}

impl Action {
    /// Every action, in catalog order.
    pub const ALL: [Self; 15] = [
        Action::Admin,
        Action::ReadOnlyPublic,
        Action::ReadAll,
        Action::ReadMetadata,
        Action::ReadPrivateKeys,
        Action::Write,
        Action::Metadata,
        Action::MetadataRead,
        Action::MetadataWrite,
        Action::MetadataWriteAdd,
        Action::MetadataWriteUpdate,
        Action::MetadataWriteDelete,
        Action::File,
        Action::FileRead,
        Action::FileWrite,
    ];

    /// Get the action identifier.
    ///
    /// # Returns
    ///
    /// The identifier stored in permissions and exchanged with callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Admin => "admin",
            Action::ReadOnlyPublic => "read_only_public",
            Action::ReadAll => "read_all",
            Action::ReadMetadata => "read_metadata",
            Action::ReadPrivateKeys => "read_private_keys",
            Action::Write => "write",
            Action::Metadata => "metadata",
            Action::MetadataRead => "metadata:read",
            Action::MetadataWrite => "metadata:write",
            Action::MetadataWriteAdd => "metadata:write:add",
            Action::MetadataWriteUpdate => "metadata:write:update",
            Action::MetadataWriteDelete => "metadata:write:delete",
            Action::File => "file",
            Action::FileRead => "file:read",
            Action::FileWrite => "file:write",
        }
    }

    /// Get the human-readable display name.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Admin => "Admin",
            Action::ReadOnlyPublic => "Read only public",
            Action::ReadAll => "Read all",
            Action::ReadMetadata => "Read metadata",
            Action::ReadPrivateKeys => "Read private keys",
            Action::Write => "Write",
            Action::Metadata => "All metadata operations",
            Action::MetadataRead => "Read metadata entries",
            Action::MetadataWrite => "All metadata write operations",
            Action::MetadataWriteAdd => "Add metadata",
            Action::MetadataWriteUpdate => "Update metadata",
            Action::MetadataWriteDelete => "Delete metadata",
            Action::File => "All file operations",
            Action::FileRead => "Read files",
            Action::FileWrite => "Write files",
        }
    }

    /// Parse an action from its identifier.
    ///
    /// Identifiers are matched exactly (case-sensitive, no aliases).
    ///
    /// # Example
    ///
    /// ```
    /// use dataware_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("read_all"), Some(Action::ReadAll));
    /// assert_eq!(Action::parse("metadata:write:add"), Some(Action::MetadataWriteAdd));
    /// assert_eq!(Action::parse("READ_ALL"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|action| action.as_str() == s)
    }

    /// Get all actions in catalog order.
    pub fn all() -> [Self; 15] {
        Self::ALL
    }

    /// Get the closest registered ancestor of this action.
    ///
    /// # Example
    ///
    /// ```
    /// use dataware_rbac::actions::Action;
    ///
    /// assert_eq!(Action::MetadataWriteAdd.parent(), Some(Action::MetadataWrite));
    /// assert_eq!(Action::Metadata.parent(), None);
    /// ```
    pub fn parent(&self) -> Option<Self> {
        let mut id = self.as_str();
        while let Some((head, _)) = id.rsplit_once(SEGMENT_SEPARATOR) {
            if let Some(parent) = Self::parse(head) {
                return Some(parent);
            }
            id = head;
        }
        None
    }

    /// Check if a grant for this action covers `other` by segment nesting.
    ///
    /// An action covers itself and every action whose identifier extends
    /// it at a segment boundary. `metadata` covers `metadata:write:add`
    /// but not `metadata_extra`.
    pub fn covers(&self, other: Action) -> bool {
        if *self == other {
            return true;
        }
        other
            .as_str()
            .strip_prefix(self.as_str())
            .is_some_and(|rest| rest.starts_with(SEGMENT_SEPARATOR))
    }

    /// Describe this action for callers.
    pub fn describe(&self) -> ActionDescription {
        ActionDescription {
            action_id: self.as_str().to_string(),
            name: self.name().to_string(),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a granted action relates to the action being checked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionPolicy {
    /// A grant only covers the exact action identifier.
    #[default]
    Exact,

    /// A grant also covers every action nested under it.
    Hierarchical,
}

impl ActionPolicy {
    /// Get the string representation of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPolicy::Exact => "exact",
            ActionPolicy::Hierarchical => "hierarchical",
        }
    }

    /// Parse a policy from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "exact" => Some(ActionPolicy::Exact),
            "hierarchical" => Some(ActionPolicy::Hierarchical),
            _ => None,
        }
    }

    /// Check if `granted` confers `requested` under this policy.
    pub fn grants(&self, granted: Action, requested: Action) -> bool {
        match self {
            ActionPolicy::Exact => granted == requested,
            ActionPolicy::Hierarchical => granted.covers(requested),
        }
    }
}

/// Public description of a catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionDescription {
    /// Action identifier.
    pub action_id: String,
    /// Display name.
    pub name: String,
}

/// Describe a registered action by identifier.
///
/// # Errors
///
/// Returns [`RbacError::ActionNotFound`] if the identifier is not registered.
pub fn describe(action_id: &str) -> RbacResult<ActionDescription> {
    Action::parse(action_id)
        .map(|action| action.describe())
        .ok_or_else(|| RbacError::ActionNotFound(action_id.to_string()))
}

/// List every registered action in declaration order.
pub fn list_all() -> Vec<ActionDescription> {
    Action::all().iter().map(Action::describe).collect()
}

/// Check if an identifier is registered.
pub fn is_valid(action_id: &str) -> bool {
    Action::parse(action_id).is_some()
}

/// Resolve a list of identifiers, reporting every unknown one.
///
/// Unknown identifiers are collected without duplicates in first-seen
/// order so a caller can fix them all at once.
///
/// # Errors
///
/// Returns [`RbacError::InvalidAction`] listing the offending identifiers.
pub fn resolve_all<S: AsRef<str>>(action_ids: &[S]) -> RbacResult<Vec<Action>> {
    let mut resolved = Vec::with_capacity(action_ids.len());
    let mut invalid: Vec<String> = Vec::new();

    for id in action_ids {
        let id = id.as_ref();
        match Action::parse(id) {
            Some(action) => resolved.push(action),
            None => {
                if !invalid.iter().any(|seen| seen == id) {
                    invalid.push(id.to_string());
                }
            }
        }
    }

    if invalid.is_empty() {
        Ok(resolved)
    } else {
        Err(RbacError::InvalidAction(invalid))
    }
}
