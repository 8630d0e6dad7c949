//! Admin resources.
//!
//! A resource is a model exposed in the admin: its schema, the attributes
//! shown on index pages, per-attribute metas, the actions offered on its
//! records and the search configuration of its index page.

use backoffice_roles::Permission;
use backoffice_search::{Filter, ModelSchema, Record, Scope, SearchConfig, SearchQuery};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::error::{AdminError, AdminResult};
use crate::inflect;

/// Validates one attribute value; the error is shown to the user.
pub type MetaValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Registration options of a resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceConfig {
    /// Overrides the model name
    pub name: Option<String>,
    /// Ancestor menu names, outermost first
    pub menu: Vec<String>,
    pub permission: Option<Permission>,
    pub singleton: bool,
    /// Register without a menu
    pub invisible: bool,
    pub skip_group_control: bool,
    pub priority: i32,
    pub page_count: Option<u64>,
    pub icon: Option<String>,
}

impl ResourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `name` instead of the model name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Place the menu under the given ancestor names.
    pub fn under<I, S>(mut self, menu: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.menu = menu.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// A resource with a single record.
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Register without a menu.
    pub fn invisible(mut self) -> Self {
        self.invisible = true;
        self
    }

    /// Decide the resource by roles only.
    pub fn skip_group_control(mut self) -> Self {
        self.skip_group_control = true;
        self
    }

    /// Menu order among siblings.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Default page size of index pages.
    pub fn with_page_count(mut self, page_count: u64) -> Self {
        self.page_count = Some(page_count);
        self
    }

    /// Menu icon name.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Per-attribute settings.
#[derive(Clone)]
pub struct Meta {
    pub name: String,
    pub label: Option<String>,
    /// Gates rendering of the attribute
    pub permission: Option<Permission>,
    /// Choices offered for the attribute
    pub collection: Vec<String>,
    validator: Option<MetaValidator>,
}

impl Meta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            permission: None,
            collection: Vec::new(),
            validator: None,
        }
    }

    /// Set the label shown to users.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Restrict rendering of the attribute to `permission`.
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Offer `choices` as the attribute's selectable values.
    pub fn with_collection<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collection = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Check submitted values with `validator`.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Label shown to users, defaulting to the attribute name.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("permission", &self.permission)
            .field("collection", &self.collection)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// A model registered in the admin.
#[derive(Debug, Clone)]
pub struct Resource {
    pub name: String,
    pub config: ResourceConfig,
    schema: Arc<ModelSchema>,
    metas: Vec<Meta>,
    actions: Vec<Action>,
    parent: Option<String>,
    children: Vec<String>,
    search: SearchConfig,
    index_attrs: Vec<String>,
}

impl Resource {
    pub(crate) fn new(schema: Arc<ModelSchema>, config: ResourceConfig) -> Self {
        let name = config.name.clone().unwrap_or_else(|| schema.name.clone());
        let mut search = SearchConfig::new();
        search.page_count = config.page_count;
        Self {
            name,
            config,
            schema,
            metas: Vec::new(),
            actions: Vec::new(),
            parent: None,
            children: Vec::new(),
            search,
            index_attrs: Vec::new(),
        }
    }

    /// The model schema.
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// The resource's role rule, if any.
    pub fn permission(&self) -> Option<&Permission> {
        self.config.permission.as_ref()
    }

    pub fn skips_group_control(&self) -> bool {
        self.config.skip_group_control
    }

    /// Name of the menu registered for this resource.
    pub fn menu_name(&self) -> String {
        if self.config.singleton {
            self.name.clone()
        } else {
            inflect::plural(&self.name)
        }
    }

    /// Route segment of the resource, e.g. `credit_cards`.
    pub fn to_param(&self) -> String {
        inflect::to_param(&self.menu_name())
    }

    /// Route parameter carrying a record id, e.g. `:credit_card_id`.
    pub fn param_id_name(&self) -> String {
        format!(":{}_id", inflect::to_param(&self.name))
    }

    /// Name of the parent resource for sub-resources.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Names of registered sub-resources.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub(crate) fn set_parent(&mut self, parent: impl Into<String>) {
        self.parent = Some(parent.into());
    }

    pub(crate) fn add_child(&mut self, child: impl Into<String>) {
        self.children.push(child.into());
    }

    /// Add or replace the meta for an attribute.
    pub fn meta(&mut self, meta: Meta) -> &mut Self {
        match self.metas.iter_mut().find(|m| m.name == meta.name) {
            Some(existing) => *existing = meta,
            None => self.metas.push(meta),
        }
        self
    }

    /// Find a meta by attribute name.
    pub fn get_meta(&self, name: &str) -> Option<&Meta> {
        self.metas.iter().find(|m| m.name == name)
    }

    pub fn metas(&self) -> &[Meta] {
        &self.metas
    }

    /// Add or replace an action.
    pub fn action(&mut self, action: Action) -> &mut Self {
        match self.actions.iter_mut().find(|a| a.name == action.name) {
            Some(existing) => *existing = action,
            None => self.actions.push(action),
        }
        self
    }

    /// Find an action by name.
    pub fn get_action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Add a search scope.
    pub fn add_scope(&mut self, scope: Scope) -> &mut Self {
        self.search.add_scope(scope);
        self
    }

    /// Add a search filter.
    pub fn add_filter(&mut self, filter: Filter) -> &mut Self {
        self.search.add_filter(filter);
        self
    }

    /// Attributes matched by keyword search.
    pub fn search_attrs<I, S>(&mut self, attrs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search.set_search_attrs(attrs);
        self
    }

    /// Attributes accepted by `order_by`.
    pub fn sortable_attrs<I, S>(&mut self, attrs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search.sortable_attrs = attrs.into_iter().map(Into::into).collect();
        self
    }

    /// Replace keyword search with a custom handler.
    pub fn set_search_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut SearchQuery, &str) + Send + Sync + 'static,
    {
        self.search.set_search_handler(handler);
        self
    }

    /// Scopes, filters and search attributes of index pages.
    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    /// Attributes listed on the index page.
    pub fn index_attrs<I, S>(&mut self, attrs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index_attrs = attrs.into_iter().map(Into::into).collect();
        self
    }

    /// Index attributes, defaulting to every schema field.
    pub fn get_index_attrs(&self) -> Vec<String> {
        if self.index_attrs.is_empty() {
            return self.schema.fields().iter().map(|f| f.name.clone()).collect();
        }
        self.index_attrs.clone()
    }

    /// Run every meta validator against the record's values.
    pub fn validate(&self, record: &Record) -> AdminResult<()> {
        let errors: Vec<String> = self
            .metas
            .iter()
            .filter_map(|meta| {
                let validator = meta.validator.as_ref()?;
                validator(record.get(&meta.name).unwrap_or(&Value::Null)).err()
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AdminError::Validation(errors.join("; ")))
        }
    }
}
