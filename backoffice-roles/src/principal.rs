//! # Principals
//!
//! The authenticated identity a request acts as, together with the role
//! names its authentication layer granted it.

use serde::{Deserialize, Serialize};

/// An authenticated user or service identity.
///
/// Immutable for the lifetime of a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    /// Stable identifier, matched against group member sets.
    pub id: String,
    /// Role names claimed by the principal.
    #[serde(default)]
    roles: Vec<String>,
}

impl Principal {
    /// Create a principal with the given roles.
    ///
    /// # Example
    ///
    /// ```
    /// use backoffice_roles::Principal;
    ///
    /// let p = Principal::new("42", ["admin"]);
    /// assert!(p.has_role("admin"));
    /// assert!(!p.has_role("viewer"));
    /// ```
    pub fn new<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut principal = Self {
            id: id.into(),
            roles: Vec::new(),
        };
        for role in roles {
            principal = principal.with_role(role);
        }
        principal
    }

    /// Add a role, ignoring duplicates.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Check whether the principal claims a role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// The claimed role names, in the order they were granted.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }
}
