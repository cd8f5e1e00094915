//! Permission service.
//!
//! The in-process surface consumed by the HTTP layer. It resolves user ids
//! to role snapshots through a [`RoleStore`], resolves action ids through
//! the catalog, and hands both to the [`Authorizer`].
//!
//! Every role mutation is validated in full before the store is touched, so
//! a rejected create or update leaves nothing behind.

use dataware_rbac::actions;
use dataware_rbac::{
    Action, ActionDescription, Authorizer, NewRole, PermittedResources, RbacError, RbacResult,
    Role, RoleId, RoleUpdate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

use crate::config::ServiceConfig;
use crate::store::{RolePage, RoleQuery, RoleStore};
use crate::users::UserView;

/// Listing parameters as received from a caller.
///
/// Missing values take the service defaults: page 0, the configured page
/// size, and no search term.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListParams {
    /// Zero-based page number
    #[serde(default)]
    pub page: Option<usize>,
    /// Page size; zero returns every match
    #[serde(default)]
    pub per_page: Option<usize>,
    /// Substring of name or description
    #[serde(default)]
    pub search: Option<String>,
}

impl ListParams {
    /// Create empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number.
    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page size.
    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Set the search term.
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

/// Role management and permission evaluation over a role store.
#[derive(Debug, Clone)]
pub struct PermissionService<S> {
    store: S,
    config: ServiceConfig,
    authorizer: Authorizer,
}

impl<S: RoleStore> PermissionService<S> {
    /// Create a service with default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    /// Create a service with explicit configuration.
    ///
    /// Inconsistent page limits are reset as by [`ServiceConfig::normalized`].
    pub fn with_config(store: S, config: ServiceConfig) -> Self {
        let config = config.normalized();
        let authorizer = Authorizer::with_policy(config.action_policy);
        Self {
            store,
            config,
            authorizer,
        }
    }

    /// Get the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// List every action in catalog order.
    pub fn list_actions(&self) -> Vec<ActionDescription> {
        actions::list_all()
    }

    /// Describe one action.
    ///
    /// # Errors
    ///
    /// Returns `ActionNotFound` for an unregistered identifier.
    pub fn describe_action(&self, action_id: &str) -> RbacResult<ActionDescription> {
        actions::describe(action_id)
    }

    /// Create a role.
    ///
    /// # Errors
    ///
    /// - `Validation` if the name is blank
    /// - `InvalidAction` listing every unknown action id; nothing is stored
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_role(&self, input: NewRole) -> RbacResult<Role> {
        let validated = input.validate().map_err(|e| {
            warn!(error = %e, "Rejected role creation");
            e
        })?;

        let role = self.store.insert_role(validated).await?;
        info!(role_id = %role.id, permissions = role.permissions.len(), "Created role");
        Ok(role)
    }

    /// Fetch a role.
    ///
    /// # Errors
    ///
    /// Returns `RoleNotFound` if the role does not exist.
    #[instrument(skip(self))]
    pub async fn get_role(&self, id: RoleId) -> RbacResult<Role> {
        self.store.get_role(id).await
    }

    /// Update a role.
    ///
    /// Omitted fields are kept. A present permission list replaces the
    /// current one entirely. The update is validated before the role is
    /// looked up, so invalid input is reported even for a missing role.
    ///
    /// # Errors
    ///
    /// - `Validation` or `InvalidAction` for bad input; nothing is changed
    /// - `RoleNotFound` if the role does not exist
    #[instrument(skip(self, update))]
    pub async fn update_role(&self, id: RoleId, update: RoleUpdate) -> RbacResult<Role> {
        let validated = update.validate().map_err(|e| {
            warn!(error = %e, "Rejected role update");
            e
        })?;

        let role = self.store.update_role(id, validated).await?;
        info!(role_id = %role.id, "Updated role");
        Ok(role)
    }

    /// Delete a role and remove it from every user holding it.
    ///
    /// # Errors
    ///
    /// Returns `RoleNotFound` if the role does not exist.
    #[instrument(skip(self))]
    pub async fn delete_role(&self, id: RoleId) -> RbacResult<()> {
        self.store.delete_role(id).await?;
        info!(role_id = %id, "Deleted role");
        Ok(())
    }

    /// List roles.
    ///
    /// Search matches a substring of the name or description, honoring the
    /// configured case sensitivity.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `per_page` exceeds the configured maximum.
    #[instrument(skip(self))]
    pub async fn list_roles(&self, params: ListParams) -> RbacResult<RolePage> {
        let per_page = params.per_page.unwrap_or(self.config.default_per_page);
        if per_page > self.config.max_per_page {
            return Err(RbacError::Validation(format!(
                "per_page must be at most {}",
                self.config.max_per_page
            )));
        }

        let query = RoleQuery {
            page: params.page.unwrap_or(0),
            per_page,
            search: params.search.unwrap_or_default(),
            case_sensitive: self.config.search_case_sensitive,
        };
        self.store.list_roles(&query).await
    }

    /// Check if a user may perform an action on a database.
    ///
    /// A user without a local record has no roles and is denied.
    ///
    /// # Errors
    ///
    /// Returns `ActionNotFound` for an unregistered action id.
    #[instrument(skip(self))]
    pub async fn is_permitted(
        &self,
        user_id: &str,
        action_id: &str,
        database_id: &str,
    ) -> RbacResult<bool> {
        let action = resolve_action(action_id)?;
        let roles = self.store.user_roles(user_id).await?;
        let permitted = self.authorizer.is_permitted(&roles, action, database_id);

        debug!(roles = roles.len(), permitted, "Checked permission");
        Ok(permitted)
    }

    /// Get every action a user may perform on a database.
    #[instrument(skip(self))]
    pub async fn permitted_actions(
        &self,
        user_id: &str,
        database_id: &str,
    ) -> RbacResult<BTreeSet<Action>> {
        let roles = self.store.user_roles(user_id).await?;
        let actions = self.authorizer.permitted_actions(&roles, database_id);

        debug!(roles = roles.len(), actions = actions.len(), "Collected permitted actions");
        Ok(actions)
    }

    /// Filter candidate databases down to those a user may access.
    ///
    /// With an action id only databases where that action is permitted are
    /// kept; without one, databases where any action is permitted.
    ///
    /// # Errors
    ///
    /// Returns `ActionNotFound` for an unregistered action id.
    #[instrument(skip(self, database_ids), fields(candidates = database_ids.len()))]
    pub async fn permitted_databases(
        &self,
        user_id: &str,
        database_ids: &[String],
        action_id: Option<&str>,
    ) -> RbacResult<PermittedResources> {
        let action = action_id.map(resolve_action).transpose()?;
        let roles = self.store.user_roles(user_id).await?;
        let selected = self
            .authorizer
            .permitted_resources(&roles, action, database_ids);

        debug!(selected = selected.len(), "Filtered permitted databases");
        Ok(selected)
    }

    /// Fetch a user with their roles.
    ///
    /// `None` when the user has no local record.
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: &str) -> RbacResult<Option<UserView>> {
        Ok(self.store.get_user(user_id).await?.map(UserView::from))
    }

    /// Record a user's display name, creating the local record if needed.
    #[instrument(skip(self))]
    pub async fn register_user(&self, user_id: &str, name: &str) -> RbacResult<UserView> {
        let assignment = self.store.upsert_user(user_id, name).await?;
        Ok(UserView::from(assignment))
    }

    /// Replace a user's roles.
    ///
    /// # Errors
    ///
    /// Returns `RoleNotFound` for the first unknown role id; the user's
    /// assignment is left unchanged.
    #[instrument(skip(self))]
    pub async fn set_user_roles(&self, user_id: &str, role_ids: &[RoleId]) -> RbacResult<UserView> {
        let assignment = self.store.set_user_roles(user_id, role_ids).await?;
        info!(roles = assignment.roles.len(), "Replaced user roles");
        Ok(UserView::from(assignment))
    }

    /// Add roles to a user.
    ///
    /// # Errors
    ///
    /// Returns `RoleNotFound` for the first unknown role id; nothing is added.
    #[instrument(skip(self))]
    pub async fn add_user_roles(&self, user_id: &str, role_ids: &[RoleId]) -> RbacResult<UserView> {
        let assignment = self.store.add_user_roles(user_id, role_ids).await?;
        info!(roles = assignment.roles.len(), "Added user roles");
        Ok(UserView::from(assignment))
    }

    /// Remove every role from a user.
    #[instrument(skip(self))]
    pub async fn clear_user_roles(&self, user_id: &str) -> RbacResult<Option<UserView>> {
        let cleared = self.store.clear_user_roles(user_id).await?;
        if cleared.is_some() {
            info!("Cleared user roles");
        }
        Ok(cleared.map(|record| UserView::new(&record, &[])))
    }
}

fn resolve_action(action_id: &str) -> RbacResult<Action> {
    Action::parse(action_id).ok_or_else(|| RbacError::ActionNotFound(action_id.to_string()))
}
