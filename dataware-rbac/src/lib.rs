//! # Dataware RBAC (Role-Based Access Control)
//!
//! This crate is the permission evaluation core of the Dataware permission
//! manager. It decides whether a user may perform an action against a
//! database, given a snapshot of the roles assigned to that user.
//!
//! ## Overview
//!
//! The dataware-rbac crate handles:
//! - **Actions**: The fixed catalog of grantable actions
//! - **Matching**: Glob matching of database ids (`*`, `?`)
//! - **Permissions**: Database patterns + action set
//! - **Roles**: Named bundles of permissions
//! - **Engine**: Allow/deny checks and permitted-action sets
//!
//! ## Architecture
//!
//! ```text
//! User ─→ Roles ─→ Permissions ─→ matcher (databases) + catalog (actions)
//!                                          └─→ Authorizer ─→ bool / set
//! ```
//!
//! Evaluation is default-deny: a check succeeds only when one permission
//! of one role covers both the database and the action.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dataware_rbac::{Action, Authorizer, Permission, Role, RoleId};
//!
//! let roles = vec![
//!     Role::new(RoleId(1), "metadata readers").with_permissions(vec![
//!         Permission::new(["testpostfix*", "*testprefix", "test?single"], [Action::ReadMetadata]),
//!     ]),
//! ];
//!
//! let authorizer = Authorizer::new();
//! assert!(authorizer.is_permitted(&roles, Action::ReadMetadata, "test1single"));
//! assert!(!authorizer.is_permitted(&roles, Action::ReadMetadata, "testsingle"));
//! ```
//!
//! ## Hierarchical Actions
//!
//! Action ids may be colon-segmented (`metadata:write:add`). By default a
//! grant covers only its exact id. [`ActionPolicy::Hierarchical`] makes a
//! grant for `metadata:write` also cover `metadata:write:add`.

pub mod actions;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod permissions;
pub mod roles;

// Re-export main types for convenience
pub use actions::{Action, ActionDescription, ActionPolicy};
pub use engine::{Authorizer, PermittedResources};
pub use error::{RbacError, RbacResult};
pub use matcher::{any_matches, matches};
pub use permissions::{Permission, PermissionInput};
pub use roles::{NewRole, Role, RoleId, RoleUpdate, ValidatedRole, ValidatedRoleUpdate};
