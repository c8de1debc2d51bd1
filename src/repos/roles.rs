use std::sync::Arc;

use crate::error::StoreError;
use crate::models::role_template::{builtin_roles, DEFAULT_ROLE_ID};
use crate::models::RoleTemplate;

use super::store::AnyStore;

const ROLES_KEY: &str = "role_templates";

#[derive(Clone)]
pub struct RoleRepository {
    store: Arc<AnyStore>,
}

impl RoleRepository {
    pub fn new(store: Arc<AnyStore>) -> Self {
        RoleRepository { store }
    }

    fn custom(&self) -> Result<Vec<RoleTemplate>, StoreError> {
        Ok(self.store.load(ROLES_KEY)?.unwrap_or_default())
    }

    /// Built-in roles followed by user-defined ones.
    pub fn list(&self) -> Result<Vec<RoleTemplate>, StoreError> {
        let mut roles = builtin_roles();
        roles.extend(self.custom()?);
        Ok(roles)
    }

    pub fn find(&self, id_or_name: &str) -> Result<Option<RoleTemplate>, StoreError> {
        Ok(self.list()?.into_iter().find(|r| r.matches(id_or_name)))
    }

    pub fn default_role(&self) -> RoleTemplate {
        builtin_roles()
            .into_iter()
            .find(|r| r.id == DEFAULT_ROLE_ID)
            .unwrap_or_else(|| RoleTemplate::new("General Assistant", "general", ""))
    }

    /// Adds a user role. Fails if the name is already taken.
    pub fn add(&self, role: &RoleTemplate) -> Result<bool, StoreError> {
        if self.find(&role.name)?.is_some() {
            return Ok(false);
        }
        let mut custom = self.custom()?;
        let mut role = role.clone();
        role.builtin = false;
        custom.push(role);
        self.store.save(ROLES_KEY, &custom)?;
        Ok(true)
    }

    /// Removes a user role. Built-in roles cannot be removed.
    pub fn remove(&self, id_or_name: &str) -> Result<bool, StoreError> {
        let mut custom = self.custom()?;
        let before = custom.len();
        custom.retain(|r| !r.matches(id_or_name));
        if custom.len() == before {
            return Ok(false);
        }
        self.store.save(ROLES_KEY, &custom)?;
        Ok(true)
    }

    pub fn import(&self, incoming: Vec<RoleTemplate>) -> Result<usize, StoreError> {
        let mut added = 0;
        for role in incoming.into_iter().filter(|r| !r.builtin) {
            if self.add(&role)? {
                added += 1;
            }
        }
        Ok(added)
    }
}
