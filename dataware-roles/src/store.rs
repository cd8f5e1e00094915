//! Role store implementation
//!
//! This module provides the persistence abstraction the permission service
//! works against, and an in-memory implementation of it.
//!
//! Stores only accept validated role data, so an action identifier that is
//! not in the catalog can never reach storage.

use async_trait::async_trait;
use dataware_rbac::{RbacError, RbacResult, Role, RoleId, ValidatedRole, ValidatedRoleUpdate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::users::{UserAssignment, UserRecord};

/// Role listing query, already bounded by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleQuery {
    /// Zero-based page number
    pub page: usize,
    /// Page size; zero returns every match
    pub per_page: usize,
    /// Substring matched against name or description; empty matches all
    pub search: String,
    /// Whether `search` is matched case-sensitively
    pub case_sensitive: bool,
}

/// One page of roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolePage {
    /// Requested page number
    pub page: usize,
    /// Requested page size
    pub per_page: usize,
    /// Number of roles on this page
    pub length: usize,
    /// Number of roles matching the search across all pages
    pub total: usize,
    /// Roles on this page, in ascending id order
    pub roles: Vec<Role>,
}

/// Store statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Persisted roles
    pub roles: usize,
    /// Local user records
    pub users: usize,
    /// User-role associations
    pub assignments: usize,
}

/// Persistence for roles and user-role assignments.
///
/// Every method is one atomic operation: implementations must never expose
/// a partially applied mutation, and deleting a role must detach it from
/// all users in the same operation.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Persist a new role and assign it an id.
    async fn insert_role(&self, role: ValidatedRole) -> RbacResult<Role>;

    /// Fetch a role.
    async fn get_role(&self, id: RoleId) -> RbacResult<Role>;

    /// Apply a partial update to a role.
    async fn update_role(&self, id: RoleId, update: ValidatedRoleUpdate) -> RbacResult<Role>;

    /// Delete a role and detach it from every user.
    async fn delete_role(&self, id: RoleId) -> RbacResult<()>;

    /// List roles matching a query.
    async fn list_roles(&self, query: &RoleQuery) -> RbacResult<RolePage>;

    /// Fetch a local user record with its roles.
    async fn get_user(&self, user_id: &str) -> RbacResult<Option<UserAssignment>>;

    /// Create or rename a local user record.
    async fn upsert_user(&self, user_id: &str, name: &str) -> RbacResult<UserAssignment>;

    /// Snapshot of the roles assigned to a user.
    ///
    /// Empty when the user has no local record.
    async fn user_roles(&self, user_id: &str) -> RbacResult<Vec<Role>>;

    /// Add roles to a user's assignment, creating the record if needed.
    ///
    /// Fails without changes if any role does not exist.
    async fn add_user_roles(
        &self,
        user_id: &str,
        role_ids: &[RoleId],
    ) -> RbacResult<UserAssignment>;

    /// Replace a user's assignment, creating the record if needed.
    ///
    /// Fails without changes if any role does not exist.
    async fn set_user_roles(
        &self,
        user_id: &str,
        role_ids: &[RoleId],
    ) -> RbacResult<UserAssignment>;

    /// Remove every role from a user. A missing user is left missing.
    async fn clear_user_roles(&self, user_id: &str) -> RbacResult<Option<UserRecord>>;

    /// Get store stats.
    async fn stats(&self) -> StoreStats;
}

#[derive(Debug, Default)]
struct StoreState {
    roles: BTreeMap<RoleId, Role>,
    users: HashMap<String, UserRecord>,
    last_id: i64,
}

impl StoreState {
    fn ensure_roles_exist(&self, role_ids: &[RoleId]) -> RbacResult<()> {
        match role_ids.iter().find(|id| !self.roles.contains_key(*id)) {
            Some(missing) => Err(RbacError::RoleNotFound(*missing)),
            None => Ok(()),
        }
    }

    fn user_entry(&mut self, user_id: &str) -> &mut UserRecord {
        self.users
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord::new(user_id))
    }

    fn resolve_roles(&self, record: &UserRecord) -> Vec<Role> {
        record
            .role_ids
            .iter()
            .filter_map(|id| self.roles.get(id).cloned())
            .collect()
    }

    fn assignment(&self, record: UserRecord) -> UserAssignment {
        let roles = self.resolve_roles(&record);
        UserAssignment { record, roles }
    }
}

/// In-memory role store.
///
/// All state sits behind a single lock, so each operation is atomic and
/// readers always see whole roles. Cloning yields another handle to the
/// same state.
#[derive(Clone, Default)]
pub struct MemoryRoleStore {
    state: Arc<RwLock<StoreState>>,
}

impl std::fmt::Debug for MemoryRoleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRoleStore").finish_non_exhaustive()
    }
}

impl MemoryRoleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with persisted roles.
    ///
    /// New roles are numbered after the highest seeded id.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if a role has a blank name or two roles share
    /// an id.
    pub fn with_roles(roles: Vec<Role>) -> RbacResult<Self> {
        let mut state = StoreState::default();
        for role in roles {
            role.validate()?;
            state.last_id = state.last_id.max(role.id.0);
            let id = role.id;
            if state.roles.insert(id, role).is_some() {
                return Err(RbacError::Validation(format!("duplicate role id {}", id)));
            }
        }
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Create a store seeded from a JSON array of persisted roles.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the document is malformed, references an
    /// unknown action, has a blank name or repeats a role id.
    pub fn from_json(json: &str) -> RbacResult<Self> {
        let roles: Vec<Role> = serde_json::from_str(json)?;
        Self::with_roles(roles)
    }

    /// Export every role in its persisted JSON form.
    pub async fn to_json(&self) -> RbacResult<String> {
        let state = self.state.read().await;
        let roles: Vec<&Role> = state.roles.values().collect();
        serde_json::to_string(&roles).map_err(|e| RbacError::Storage(e.to_string()))
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn insert_role(&self, role: ValidatedRole) -> RbacResult<Role> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let role = role.into_role(RoleId(state.last_id));
        state.roles.insert(role.id, role.clone());

        tracing::debug!(role_id = %role.id, "Inserted role");
        Ok(role)
    }

    async fn get_role(&self, id: RoleId) -> RbacResult<Role> {
        let state = self.state.read().await;
        state.roles.get(&id).cloned().ok_or(RbacError::RoleNotFound(id))
    }

    async fn update_role(&self, id: RoleId, update: ValidatedRoleUpdate) -> RbacResult<Role> {
        let mut state = self.state.write().await;
        let role = state.roles.get_mut(&id).ok_or(RbacError::RoleNotFound(id))?;
        role.apply(update);
        Ok(role.clone())
    }

    async fn delete_role(&self, id: RoleId) -> RbacResult<()> {
        let mut state = self.state.write().await;
        if state.roles.remove(&id).is_none() {
            return Err(RbacError::RoleNotFound(id));
        }

        let mut detached = 0usize;
        for user in state.users.values_mut() {
            if user.role_ids.remove(&id) {
                detached += 1;
            }
        }

        tracing::debug!(role_id = %id, detached, "Deleted role");
        Ok(())
    }

    async fn list_roles(&self, query: &RoleQuery) -> RbacResult<RolePage> {
        let state = self.state.read().await;
        let matching: Vec<&Role> = state
            .roles
            .values()
            .filter(|role| role.matches_search(&query.search, query.case_sensitive))
            .collect();
        let total = matching.len();

        let roles: Vec<Role> = if query.per_page == 0 {
            matching.into_iter().cloned().collect()
        } else {
            matching
                .into_iter()
                .skip(query.page.saturating_mul(query.per_page))
                .take(query.per_page)
                .cloned()
                .collect()
        };

        Ok(RolePage {
            page: query.page,
            per_page: query.per_page,
            length: roles.len(),
            total,
            roles,
        })
    }

    async fn get_user(&self, user_id: &str) -> RbacResult<Option<UserAssignment>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(user_id)
            .cloned()
            .map(|record| state.assignment(record)))
    }

    async fn upsert_user(&self, user_id: &str, name: &str) -> RbacResult<UserAssignment> {
        let mut state = self.state.write().await;
        let user = state.user_entry(user_id);
        user.name = name.to_string();
        let record = user.clone();
        Ok(state.assignment(record))
    }

    async fn user_roles(&self, user_id: &str) -> RbacResult<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(user_id)
            .map(|user| state.resolve_roles(user))
            .unwrap_or_default())
    }

    async fn add_user_roles(
        &self,
        user_id: &str,
        role_ids: &[RoleId],
    ) -> RbacResult<UserAssignment> {
        let mut state = self.state.write().await;
        state.ensure_roles_exist(role_ids)?;
        let user = state.user_entry(user_id);
        user.role_ids.extend(role_ids.iter().copied());
        let record = user.clone();
        Ok(state.assignment(record))
    }

    async fn set_user_roles(
        &self,
        user_id: &str,
        role_ids: &[RoleId],
    ) -> RbacResult<UserAssignment> {
        let mut state = self.state.write().await;
        state.ensure_roles_exist(role_ids)?;
        let user = state.user_entry(user_id);
        user.role_ids = role_ids.iter().copied().collect::<BTreeSet<_>>();
        let record = user.clone();
        Ok(state.assignment(record))
    }

    async fn clear_user_roles(&self, user_id: &str) -> RbacResult<Option<UserRecord>> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(user_id).map(|user| {
            user.role_ids.clear();
            user.clone()
        }))
    }

    async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        StoreStats {
            roles: state.roles.len(),
            users: state.users.len(),
            assignments: state.users.values().map(|u| u.role_ids.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataware_rbac::{Action, NewRole, Permission, PermissionInput, RoleUpdate};

    fn validated(name: &str, description: &str) -> ValidatedRole {
        NewRole::new(name, vec![PermissionInput::new(["database1"], ["read_all"])])
            .with_description(description)
            .validate()
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryRoleStore::new();
        let first = store.insert_role(validated("role1", "")).await.unwrap();
        let second = store.insert_role(validated("role2", "")).await.unwrap();
        assert_eq!(first.id, RoleId(1));
        assert_eq!(second.id, RoleId(2));
        assert_eq!(store.get_role(RoleId(2)).await.unwrap().name, "role2");
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = MemoryRoleStore::new();
        let first = store.insert_role(validated("a", "")).await.unwrap();
        store.delete_role(first.id).await.unwrap();
        let second = store.insert_role(validated("b", "")).await.unwrap();
        assert_eq!(second.id, RoleId(2));
    }

    #[tokio::test]
    async fn test_missing_role_operations() {
        let store = MemoryRoleStore::new();
        let missing = RoleId(10_000_000);
        assert_eq!(store.get_role(missing).await, Err(RbacError::RoleNotFound(missing)));
        assert_eq!(store.delete_role(missing).await, Err(RbacError::RoleNotFound(missing)));
        let update = RoleUpdate::new().name("x").validate().unwrap();
        assert_eq!(
            store.update_role(missing, update).await,
            Err(RbacError::RoleNotFound(missing))
        );
    }

    #[tokio::test]
    async fn test_update_role_in_place() {
        let store = MemoryRoleStore::new();
        let role = store.insert_role(validated("role", "desc")).await.unwrap();
        let update = RoleUpdate::new()
            .description("new description")
            .permissions(vec![])
            .validate()
            .unwrap();

        let updated = store.update_role(role.id, update).await.unwrap();
        assert_eq!(updated.name, "role");
        assert_eq!(updated.description, "new description");
        assert!(updated.permissions.is_empty());
        assert_eq!(store.get_role(role.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let store = MemoryRoleStore::new();
        for i in 0..5 {
            store.insert_role(validated(&format!("role{}", i), "")).await.unwrap();
        }

        let query = RoleQuery { page: 1, per_page: 2, ..Default::default() };
        let page = store.list_roles(&query).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.length, 2);
        assert_eq!(page.roles[0].name, "role2");
        assert_eq!(page.roles[1].name, "role3");

        let query = RoleQuery { page: 2, per_page: 2, ..Default::default() };
        assert_eq!(store.list_roles(&query).await.unwrap().length, 1);

        let query = RoleQuery { page: 100, per_page: 25, ..Default::default() };
        let page = store.list_roles(&query).await.unwrap();
        assert_eq!(page.length, 0);
        assert!(page.roles.is_empty());
        assert_eq!(page.total, 5);

        let query = RoleQuery { page: 3, per_page: 0, ..Default::default() };
        assert_eq!(store.list_roles(&query).await.unwrap().length, 5);

        let query = RoleQuery { page: usize::MAX, per_page: usize::MAX, ..Default::default() };
        assert_eq!(store.list_roles(&query).await.unwrap().length, 0);
    }

    #[tokio::test]
    async fn test_list_search() {
        let store = MemoryRoleStore::new();
        store.insert_role(validated("Readers", "can read")).await.unwrap();
        store.insert_role(validated("writers", "can WRITE")).await.unwrap();

        let mut query = RoleQuery { search: "write".to_string(), ..Default::default() };
        assert_eq!(store.list_roles(&query).await.unwrap().total, 1);

        query.search = "readers".to_string();
        assert_eq!(store.list_roles(&query).await.unwrap().total, 1);
        query.case_sensitive = true;
        assert_eq!(store.list_roles(&query).await.unwrap().total, 0);

        query.search = "can".to_string();
        assert_eq!(store.list_roles(&query).await.unwrap().total, 2);
        query.search = "keyword that does not exist".to_string();
        assert_eq!(store.list_roles(&query).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_user_assignment() {
        let store = MemoryRoleStore::new();
        let r1 = store.insert_role(validated("r1", "")).await.unwrap();
        let r2 = store.insert_role(validated("r2", "")).await.unwrap();

        assert!(store.get_user("u").await.unwrap().is_none());
        assert!(store.user_roles("u").await.unwrap().is_empty());

        let user = store.add_user_roles("u", &[r1.id]).await.unwrap();
        assert_eq!(user.record.role_ids.len(), 1);
        let user = store.add_user_roles("u", &[r1.id, r2.id]).await.unwrap();
        assert_eq!(user.record.role_ids.len(), 2);
        assert_eq!(user.roles, vec![r1.clone(), r2.clone()]);

        let user = store.set_user_roles("u", &[r2.id]).await.unwrap();
        assert_eq!(user.record.role_ids, BTreeSet::from([r2.id]));
        assert_eq!(user.roles, vec![r2.clone()]);

        let roles = store.user_roles("u").await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "r2");

        let cleared = store.clear_user_roles("u").await.unwrap().unwrap();
        assert!(cleared.role_ids.is_empty());
        assert!(store.clear_user_roles("nobody").await.unwrap().is_none());
        assert!(store.get_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_role_assignment_changes_nothing() {
        let store = MemoryRoleStore::new();
        let r1 = store.insert_role(validated("r1", "")).await.unwrap();
        store.set_user_roles("u", &[r1.id]).await.unwrap();

        let err = store.set_user_roles("u", &[RoleId(99)]).await.unwrap_err();
        assert_eq!(err, RbacError::RoleNotFound(RoleId(99)));
        let err = store.add_user_roles("u", &[r1.id, RoleId(42)]).await.unwrap_err();
        assert_eq!(err, RbacError::RoleNotFound(RoleId(42)));
        assert!(store.add_user_roles("new", &[RoleId(5)]).await.is_err());

        let user = store.get_user("u").await.unwrap().unwrap();
        assert_eq!(user.record.role_ids, BTreeSet::from([r1.id]));
        assert!(store.get_user("new").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_detaches_from_users() {
        let store = MemoryRoleStore::new();
        let r1 = store.insert_role(validated("r1", "")).await.unwrap();
        let r2 = store.insert_role(validated("r2", "")).await.unwrap();
        store.set_user_roles("a", &[r1.id, r2.id]).await.unwrap();
        store.set_user_roles("b", &[r1.id]).await.unwrap();
        assert_eq!(store.stats().await.assignments, 3);

        store.delete_role(r1.id).await.unwrap();

        let a = store.get_user("a").await.unwrap().unwrap();
        assert_eq!(a.record.role_ids, BTreeSet::from([r2.id]));
        assert_eq!(a.roles, vec![r2]);
        let b = store.get_user("b").await.unwrap().unwrap();
        assert!(b.record.role_ids.is_empty());
        assert!(b.roles.is_empty());
        assert_eq!(
            store.stats().await,
            StoreStats { roles: 1, users: 2, assignments: 1 }
        );
    }

    #[tokio::test]
    async fn test_upsert_user_keeps_roles() {
        let store = MemoryRoleStore::new();
        let r1 = store.insert_role(validated("r1", "")).await.unwrap();
        store.add_user_roles("u", &[r1.id]).await.unwrap();
        let user = store.upsert_user("u", "Test User").await.unwrap();
        assert_eq!(user.record.name, "Test User");
        assert_eq!(user.roles, vec![r1]);
    }

    #[tokio::test]
    async fn test_seed_from_json_and_export() {
        let json = r#"[
            {"id": 3, "name": "r3", "description": "",
             "permissions": [{"databases": ["db*"], "action_ids": ["write"]}]},
            {"id": 1, "name": "r1", "description": "first", "permissions": []}
        ]"#;
        let store = MemoryRoleStore::from_json(json).unwrap();
        let role = store.get_role(RoleId(3)).await.unwrap();
        assert_eq!(role.permissions, vec![Permission::new(["db*"], [Action::Write])]);

        let next = store.insert_role(validated("next", "")).await.unwrap();
        assert_eq!(next.id, RoleId(4));

        let exported = MemoryRoleStore::from_json(&store.to_json().await.unwrap()).unwrap();
        assert_eq!(exported.stats().await.roles, 3);
    }

    #[test]
    fn test_seed_rejects_blank_names() {
        let json = r#"[
            {"id": 1, "name": "r1", "description": "", "permissions": []},
            {"id": 2, "name": "", "description": "", "permissions": []}
        ]"#;
        assert!(matches!(
            MemoryRoleStore::from_json(json),
            Err(RbacError::Validation(_))
        ));
        assert!(MemoryRoleStore::with_roles(vec![Role::new(RoleId(1), " ")]).is_err());
    }

    #[tokio::test]
    async fn test_seed_rejects_bad_documents() {
        let duplicate = r#"[{"id": 1, "name": "a", "permissions": []},
                            {"id": 1, "name": "b", "permissions": []}]"#;
        assert!(matches!(MemoryRoleStore::from_json(duplicate), Err(RbacError::Validation(_))));

        let unknown = r#"[{"id": 1, "name": "a",
            "permissions": [{"databases": ["*"], "action_ids": ["superpower"]}]}]"#;
        assert!(matches!(MemoryRoleStore::from_json(unknown), Err(RbacError::Validation(_))));
    }
}
