//! # Dataware Roles
//!
//! Role management and user-level permission checks for the Dataware
//! permission manager, built on `dataware-rbac`.
//!
//! ## Overview
//!
//! The dataware-roles crate handles:
//! - **Store**: Persistence abstraction for roles and user-role assignments
//! - **Users**: Local records linking identity-provider subjects to roles
//! - **Service**: CRUD over roles and `user id → allow/deny` evaluation
//! - **Config**: Page limits, search behaviour and action policy
//!
//! ## Architecture
//!
//! ```text
//! HTTP layer
//!   └─ PermissionService
//!        ├─ RoleStore (MemoryRoleStore) ─→ role snapshot
//!        └─ Authorizer (dataware-rbac)  ─→ bool / action set
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dataware_roles::{MemoryRoleStore, PermissionService};
//! use dataware_rbac::{NewRole, PermissionInput};
//!
//! # async fn example() -> dataware_rbac::RbacResult<()> {
//! let service = PermissionService::new(MemoryRoleStore::new());
//!
//! let role = service
//!     .create_role(NewRole::new(
//!         "readers",
//!         vec![PermissionInput::new(["database*"], ["read_all"])],
//!     ))
//!     .await?;
//! service.set_user_roles("auth0|user", &[role.id]).await?;
//!
//! assert!(service.is_permitted("auth0|user", "read_all", "database1").await?);
//! assert!(!service.is_permitted("auth0|user", "write", "database1").await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod service;
pub mod store;
pub mod users;

// Re-export main types for convenience
pub use config::{ConfigError, ServiceConfig};
pub use service::{ListParams, PermissionService};
pub use store::{MemoryRoleStore, RolePage, RoleQuery, RoleStore, StoreStats};
pub use users::{RoleSummary, UserAssignment, UserRecord, UserView};
