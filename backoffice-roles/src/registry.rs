//! # Role Registry
//!
//! Named role checkers that derive extra roles from a principal, on top of
//! the roles its authentication layer already claimed.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::principal::Principal;

/// Predicate deciding whether a principal holds a derived role.
pub type RoleChecker = Arc<dyn Fn(&Principal) -> bool + Send + Sync>;

/// Registry of derived roles.
///
/// # Example
///
/// ```
/// use backoffice_roles::{Principal, RoleRegistry};
///
/// let mut registry = RoleRegistry::new();
/// registry.register("staff", |p: &Principal| p.id.starts_with("emp-"));
///
/// let roles = registry.matched_roles(&Principal::new("emp-7", ["viewer"]));
/// assert_eq!(roles, vec!["viewer".to_string(), "staff".to_string()]);
/// ```
#[derive(Clone, Default)]
pub struct RoleRegistry {
    checkers: BTreeMap<String, RoleChecker>,
}

impl RoleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a derived role.
    pub fn register<F>(&mut self, name: impl Into<String>, checker: F)
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.checkers.insert(name.into(), Arc::new(checker));
    }

    /// Remove a derived role.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.checkers.remove(name).is_some()
    }

    /// Check if a role name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.checkers.contains_key(name)
    }

    /// All roles the principal holds: its claimed roles first, then every
    /// registered role whose checker matches, without duplicates.
    pub fn matched_roles(&self, principal: &Principal) -> Vec<String> {
        let mut roles = principal.roles().to_vec();
        for (name, checker) in &self.checkers {
            if !roles.contains(name) && checker(principal) {
                roles.push(name.clone());
            }
        }
        roles
    }
}

impl fmt::Debug for RoleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleRegistry")
            .field("roles", &self.checkers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checker_adds_role() {
        let mut registry = RoleRegistry::new();
        registry.register("admin", |p: &Principal| p.id == "root");

        assert_eq!(registry.matched_roles(&Principal::new("root", Vec::<String>::new())), ["admin"]);
        assert!(registry.matched_roles(&Principal::new("bob", Vec::<String>::new())).is_empty());
    }

    #[test]
    fn test_claimed_role_not_duplicated() {
        let mut registry = RoleRegistry::new();
        registry.register("admin", |_: &Principal| true);

        let roles = registry.matched_roles(&Principal::new("root", ["admin"]));
        assert_eq!(roles, ["admin"]);
    }

    #[test]
    fn test_unregister() {
        let mut registry = RoleRegistry::new();
        registry.register("admin", |_: &Principal| true);
        assert!(registry.contains("admin"));
        assert!(registry.unregister("admin"));
        assert!(!registry.unregister("admin"));
    }
}
