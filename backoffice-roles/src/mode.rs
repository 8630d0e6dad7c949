//! # Permission Modes
//!
//! The four CRUD modes every admin permission check is phrased in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A mode a principal may be granted on a menu, resource, action or field.
///
/// - **Create**: add new records
/// - **Read**: list and view records
/// - **Update**: modify records, and the fallback for custom action verbs
/// - **Delete**: remove records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    /// Create new records.
    Create,

    /// Read/list records.
    Read,

    /// Update existing records.
    Update,

    /// Delete records.
    Delete,
}

/// Shorthand for all four modes.
pub const CRUD: [PermissionMode; 4] = [
    PermissionMode::Create,
    PermissionMode::Read,
    PermissionMode::Update,
    PermissionMode::Delete,
];

impl PermissionMode {
    /// Get the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Create => "create",
            PermissionMode::Read => "read",
            PermissionMode::Update => "update",
            PermissionMode::Delete => "delete",
        }
    }

    /// Parse a mode from its name or a common alias.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Returns
    ///
    /// `Some(PermissionMode)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use backoffice_roles::PermissionMode;
    ///
    /// assert_eq!(PermissionMode::parse("read"), Some(PermissionMode::Read));
    /// assert_eq!(PermissionMode::parse("edit"), Some(PermissionMode::Update));
    /// assert_eq!(PermissionMode::parse("publish"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "create" | "new" | "add" => Some(PermissionMode::Create),
            "read" | "view" | "show" | "index" => Some(PermissionMode::Read),
            "update" | "edit" | "write" => Some(PermissionMode::Update),
            "delete" | "remove" | "destroy" => Some(PermissionMode::Delete),
            _ => None,
        }
    }

    /// Map an HTTP verb to the mode a route guard checks.
    ///
    /// Returns `None` for verbs with no CRUD meaning (e.g. `OPTIONS`).
    ///
    /// # Example
    ///
    /// ```
    /// use backoffice_roles::PermissionMode;
    ///
    /// assert_eq!(PermissionMode::from_http_method("POST"), Some(PermissionMode::Create));
    /// assert_eq!(PermissionMode::from_http_method("patch"), Some(PermissionMode::Update));
    /// assert_eq!(PermissionMode::from_http_method("OPTIONS"), None);
    /// ```
    pub fn from_http_method(method: &str) -> Option<Self> {
        match method.to_uppercase().as_str() {
            "POST" => Some(PermissionMode::Create),
            "GET" | "HEAD" => Some(PermissionMode::Read),
            "PUT" | "PATCH" => Some(PermissionMode::Update),
            "DELETE" => Some(PermissionMode::Delete),
            _ => None,
        }
    }

    /// Get all modes.
    pub fn all() -> Vec<Self> {
        CRUD.to_vec()
    }

    /// Check if this mode only reads data.
    pub fn is_read_only(&self) -> bool {
        matches!(self, PermissionMode::Read)
    }

    /// Check if this mode modifies data.
    pub fn is_write(&self) -> bool {
        !self.is_read_only()
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_as_str() {
        assert_eq!(PermissionMode::Create.as_str(), "create");
        assert_eq!(PermissionMode::Read.as_str(), "read");
        assert_eq!(PermissionMode::Update.as_str(), "update");
        assert_eq!(PermissionMode::Delete.as_str(), "delete");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(PermissionMode::parse("READ"), Some(PermissionMode::Read));
        assert_eq!(PermissionMode::parse("new"), Some(PermissionMode::Create));
        assert_eq!(PermissionMode::parse("destroy"), Some(PermissionMode::Delete));
        assert_eq!(PermissionMode::parse(""), None);
    }

    #[test]
    fn test_from_http_method() {
        assert_eq!(PermissionMode::from_http_method("GET"), Some(PermissionMode::Read));
        assert_eq!(PermissionMode::from_http_method("head"), Some(PermissionMode::Read));
        assert_eq!(PermissionMode::from_http_method("PUT"), Some(PermissionMode::Update));
        assert_eq!(PermissionMode::from_http_method("DELETE"), Some(PermissionMode::Delete));
        assert_eq!(PermissionMode::from_http_method("TRACE"), None);
    }

    #[test]
    fn test_crud_covers_all() {
        assert_eq!(PermissionMode::all().len(), 4);
        assert!(CRUD.contains(&PermissionMode::Delete));
    }

    #[test]
    fn test_read_write() {
        assert!(PermissionMode::Read.is_read_only());
        assert!(PermissionMode::Create.is_write());
        assert!(!PermissionMode::Delete.is_read_only());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&PermissionMode::Update).unwrap();
        assert_eq!(json, "\"update\"");
    }
}
