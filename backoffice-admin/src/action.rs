//! Resource actions.
//!
//! An action is an operation offered on records of a resource (publish,
//! approve, delete). Where it shows up is decided by its modes: `index`,
//! `batch`, `edit`, `show`, `menu_item`. An `index` action is offered in
//! batch mode too.

use backoffice_roles::{Permission, PermissionMode};
use backoffice_search::Record;
use std::fmt;
use std::sync::Arc;

use crate::context::PermissionContext;
use crate::error::AdminResult;

/// Decides whether an action is offered for one record.
pub type RecordPredicate = Arc<dyn Fn(&Record, &PermissionContext) -> bool + Send + Sync>;

/// Runs an action.
pub type ActionHandler = Arc<dyn Fn(&ActionArgument<'_>) -> AdminResult<()> + Send + Sync>;

/// What an action handler gets to work with.
#[derive(Debug)]
pub struct ActionArgument<'a> {
    pub action: &'a Action,
    pub resource: &'a str,
    pub records: &'a [Record],
    pub context: &'a PermissionContext,
}

/// An operation on records of a resource.
#[derive(Clone)]
pub struct Action {
    pub name: String,
    pub label: Option<String>,
    /// HTTP method the action is submitted with
    pub method: String,
    pub modes: Vec<String>,
    pub permission: Option<Permission>,
    /// Ignore group grants for this action
    pub skip_group_control: bool,
    visible: Option<RecordPredicate>,
    handler: Option<ActionHandler>,
}

impl Action {
    /// Create an action shown on every mode.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            method: "GET".to_string(),
            modes: Vec::new(),
            permission: None,
            skip_group_control: false,
            visible: None,
            handler: None,
        }
    }

    /// Set the label shown on buttons.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the HTTP method, which also picks the permission mode.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Limit the pages the action appears on.
    pub fn with_modes<I, S>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modes = modes.into_iter().map(Into::into).collect();
        self
    }

    /// Require `permission` in addition to the resource's.
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Decide the action by roles only.
    pub fn skip_group_control(mut self) -> Self {
        self.skip_group_control = true;
        self
    }

    /// Show the action only for records passing `visible`.
    pub fn with_visible<F>(mut self, visible: F) -> Self
    where
        F: Fn(&Record, &PermissionContext) -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(visible));
        self
    }

    /// Run `handler` when the action executes.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ActionArgument<'_>) -> AdminResult<()> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Whether the action is offered in `mode` (e.g. `"edit"`).
    pub fn has_mode(&self, mode: &str) -> bool {
        self.modes
            .iter()
            .any(|m| m == mode || (m == "index" && mode == "batch"))
    }

    /// Mode checked before offering or running the action:
    /// POST creates, DELETE deletes, PUT updates, GET reads, anything else
    /// updates.
    pub fn permission_mode(&self) -> PermissionMode {
        match self.method.to_uppercase().as_str() {
            "POST" => PermissionMode::Create,
            "DELETE" => PermissionMode::Delete,
            "PUT" => PermissionMode::Update,
            "GET" => PermissionMode::Read,
            _ => PermissionMode::Update,
        }
    }

    /// Whether the visible predicate accepts every record.
    pub fn is_visible(&self, records: &[Record], context: &PermissionContext) -> bool {
        match &self.visible {
            Some(visible) => records.iter().all(|r| visible(r, context)),
            None => true,
        }
    }

    /// The handler, if one is set.
    pub fn handler(&self) -> Option<&ActionHandler> {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("modes", &self.modes)
            .field("permission", &self.permission)
            .field("skip_group_control", &self.skip_group_control)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_roles::Principal;
    use serde_json::json;

    #[test]
    fn test_index_action_shows_in_batch() {
        let action = Action::new("Export").with_modes(["index"]);
        assert!(action.has_mode("index"));
        assert!(action.has_mode("batch"));
        assert!(!action.has_mode("edit"));
    }

    #[test]
    fn test_permission_mode() {
        assert_eq!(Action::new("a").with_method("post").permission_mode(), PermissionMode::Create);
        assert_eq!(Action::new("a").with_method("DELETE").permission_mode(), PermissionMode::Delete);
        assert_eq!(Action::new("a").permission_mode(), PermissionMode::Read);
        assert_eq!(Action::new("a").with_method("PATCH").permission_mode(), PermissionMode::Update);
    }

    #[test]
    fn test_visible_needs_every_record() {
        let action = Action::new("Ship").with_visible(|record, _| record["State"] == json!("paid"));
        let ctx = PermissionContext::new(Principal::new("1", Vec::<String>::new()), false);

        let paid = json!({"State": "paid"}).as_object().cloned().unwrap_or_default();
        let draft = json!({"State": "draft"}).as_object().cloned().unwrap_or_default();

        assert!(action.is_visible(&[paid.clone()], &ctx));
        assert!(!action.is_visible(&[paid, draft], &ctx));
        assert!(action.is_visible(&[], &ctx));
    }
}
