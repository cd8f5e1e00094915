//! Role domain models
//!
//! A role is a named, reusable bundle of permissions. This module holds the
//! persisted role shape and the validated inputs used to create or modify
//! one.

use serde::{Deserialize, Serialize};

use crate::error::{RbacError, RbacResult};
use crate::permissions::{self, Permission, PermissionInput};

/// Surrogate key of a persisted role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RoleId(pub i64);

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RoleId {
    fn from(id: i64) -> Self {
        RoleId(id)
    }
}

/// A persisted role.
///
/// Serializes to the stored shape:
/// `{id, name, description, permissions: [{databases, action_ids}]}`.
///
/// # Examples
///
/// ```
/// use dataware_rbac::{Action, Permission, Role, RoleId};
///
/// let role = Role::new(RoleId(1), "readers")
///     .with_description("Read everything")
///     .with_permissions(vec![Permission::new(["*"], [Action::ReadAll])]);
/// assert_eq!(role.permissions.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// Role ID
    pub id: RoleId,

    /// Display name (not required to be unique)
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Grants, in the order they were given
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    /// Creates a role with no description and no permissions.
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            permissions: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the permission list.
    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Parse a role from its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the document is malformed, references an
    /// unknown action or has a blank name.
    pub fn from_json(json: &str) -> RbacResult<Self> {
        let role: Self = serde_json::from_str(json)?;
        role.validate()?;
        Ok(role)
    }

    /// Check the rules a created role is held to.
    ///
    /// Typed permissions already name catalog actions, so only the name is
    /// left to check.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name is blank.
    pub fn validate(&self) -> RbacResult<()> {
        validate_name(&self.name)
    }

    /// Check if the role's name or description contains `term`.
    ///
    /// An empty term matches every role.
    pub fn matches_search(&self, term: &str, case_sensitive: bool) -> bool {
        if term.is_empty() {
            return true;
        }
        if case_sensitive {
            self.name.contains(term) || self.description.contains(term)
        } else {
            let term = term.to_lowercase();
            self.name.to_lowercase().contains(&term)
                || self.description.to_lowercase().contains(&term)
        }
    }

    /// Apply a validated update in place.
    ///
    /// A present permission list replaces the existing one entirely.
    pub fn apply(&mut self, update: ValidatedRoleUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(permissions) = update.permissions {
            self.permissions = permissions;
        }
    }
}

/// Input for creating a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRole {
    /// Role name
    pub name: String,

    /// Role description
    #[serde(default)]
    pub description: String,

    /// Grants to attach
    pub permissions: Vec<PermissionInput>,
}

impl NewRole {
    /// Create role input with an empty description.
    pub fn new(name: impl Into<String>, permissions: Vec<PermissionInput>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            permissions,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Parse creation input from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when required fields are missing or mistyped.
    pub fn from_json(json: &str) -> RbacResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate names and resolve every action identifier.
    ///
    /// # Errors
    ///
    /// - `Validation` if the name is blank
    /// - `InvalidAction` listing every unknown identifier
    pub fn validate(&self) -> RbacResult<ValidatedRole> {
        validate_name(&self.name)?;
        let permissions = permissions::validate_all(&self.permissions)?;
        Ok(ValidatedRole {
            name: self.name.clone(),
            description: self.description.clone(),
            permissions,
        })
    }
}

/// Role creation input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRole {
    /// Role name
    pub name: String,
    /// Role description
    pub description: String,
    /// Resolved grants
    pub permissions: Vec<Permission>,
}

impl ValidatedRole {
    /// Materialize a role under the given id.
    pub fn into_role(self, id: RoleId) -> Role {
        Role {
            id,
            name: self.name,
            description: self.description,
            permissions: self.permissions,
        }
    }
}

/// Partial update of a role.
///
/// Omitted fields are left unchanged. A present `permissions` list replaces
/// the whole sequence; individual permissions cannot be patched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RoleUpdate {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Replacement permission list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<PermissionInput>>,
}

impl RoleUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the new name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the new description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the permission list.
    pub fn permissions(mut self, permissions: Vec<PermissionInput>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Parse an update from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when a present field has the wrong type.
    pub fn from_json(json: &str) -> RbacResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate present fields.
    ///
    /// # Errors
    ///
    /// - `Validation` if a present name is blank
    /// - `InvalidAction` listing every unknown identifier
    pub fn validate(&self) -> RbacResult<ValidatedRoleUpdate> {
        if let Some(ref name) = self.name {
            validate_name(name)?;
        }
        let permissions = match self.permissions {
            Some(ref inputs) => Some(permissions::validate_all(inputs)?),
            None => None,
        };
        Ok(ValidatedRoleUpdate {
            name: self.name.clone(),
            description: self.description.clone(),
            permissions,
        })
    }
}

/// Role update that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatedRoleUpdate {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// Replacement grants
    pub permissions: Option<Vec<Permission>>,
}

fn validate_name(name: &str) -> RbacResult<()> {
    if name.trim().is_empty() {
        return Err(RbacError::Validation("role name must not be empty".to_string()));
    }
    Ok(())
}
