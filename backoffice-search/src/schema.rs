//! Model schemas
//!
//! Searches run against an explicit description of each model: its table,
//! its fields with their column and value kind, and its relationships to
//! other models. Schemas are registered once at startup in a
//! [`SchemaRegistry`] and shared read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Value kind of a field, deciding how keywords are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Bool,
    Time,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::Time => "time",
        };
        f.write_str(s)
    }
}

/// A model field mapped to a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Attribute name used in search attributes, filters and `order_by`
    pub name: String,
    /// Database column
    pub column: String,
    pub kind: FieldKind,
    pub primary_key: bool,
}

impl Field {
    /// A field stored in `column`.
    pub fn new(name: impl Into<String>, column: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            kind,
            primary_key: false,
        }
    }

    /// Mark the field as (part of) the primary key.
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// A pair of columns joined by equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// Referencing column
    pub foreign: String,
    /// Referenced column
    pub primary: String,
}

impl KeyPair {
    /// Pair a foreign key column with the key it references.
    pub fn new(foreign: impl Into<String>, primary: impl Into<String>) -> Self {
        Self {
            foreign: foreign.into(),
            primary: primary.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Owner holds the foreign key: `owner.foreign = target.primary`
    BelongsTo,
    /// Target holds the foreign key: `target.foreign = owner.primary`
    HasOne,
    /// Like `HasOne`, with many targets
    HasMany,
    /// Linked through a join table
    ManyToMany,
}

/// Join table of a many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    pub table: String,
    /// `foreign` is the join table column, `primary` the owner column
    pub owner_keys: Vec<KeyPair>,
    /// `foreign` is the join table column, `primary` the target column
    pub target_keys: Vec<KeyPair>,
}

/// A relationship from one model to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Attribute name used in dotted search paths, e.g. `Company`
    pub name: String,
    pub kind: RelationKind,
    /// Name of the target model in the registry
    pub target: String,
    /// Key pairs for belongs-to/has-one/has-many, see [`RelationKind`]
    pub keys: Vec<KeyPair>,
    /// Join table for many-to-many
    pub join_table: Option<JoinTable>,
}

impl Relationship {
    /// `owner.foreign_key = target.primary_key`
    pub fn belongs_to(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self::keyed(name, RelationKind::BelongsTo, target, foreign_key, primary_key)
    }

    /// `target.foreign_key = owner.primary_key`
    pub fn has_one(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self::keyed(name, RelationKind::HasOne, target, foreign_key, primary_key)
    }

    /// `target.foreign_key = owner.primary_key`
    pub fn has_many(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self::keyed(name, RelationKind::HasMany, target, foreign_key, primary_key)
    }

    /// A relationship through a join table.
    pub fn many_to_many(name: impl Into<String>, target: impl Into<String>, join_table: JoinTable) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::ManyToMany,
            target: target.into(),
            keys: Vec::new(),
            join_table: Some(join_table),
        }
    }

    fn keyed(
        name: impl Into<String>,
        kind: RelationKind,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            keys: vec![KeyPair::new(foreign_key, primary_key)],
            join_table: None,
        }
    }
}

/// Description of one model.
///
/// # Examples
///
/// ```
/// use backoffice_search::schema::{Field, FieldKind, ModelSchema, Relationship};
///
/// let user = ModelSchema::new("User", "users")
///     .field(Field::new("ID", "id", FieldKind::Integer).primary())
///     .field(Field::new("Name", "name", FieldKind::String))
///     .field(Field::new("CompanyID", "company_id", FieldKind::Integer))
///     .relationship(Relationship::belongs_to("Company", "Company", "company_id", "id"));
///
/// assert_eq!(user.lookup_field("name").map(|f| f.name.as_str()), Some("Name"));
/// assert!(user.find_relationship("Company").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    pub name: String,
    pub table: String,
    fields: Vec<Field>,
    relationships: Vec<Relationship>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            fields: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Add a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a relationship.
    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Find a field by attribute name or column name.
    pub fn lookup_field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.column == name))
    }

    /// Find a field by column name.
    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Find a relationship by field name.
    pub fn find_relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Fields making up the primary key.
    pub fn primary_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    /// Non-key string fields, the default keyword search attributes.
    pub fn string_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::String && !f.primary_key)
    }
}

/// Registry of model schemas by model name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    models: HashMap<String, Arc<ModelSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a schema under its model name.
    pub fn register(&mut self, schema: ModelSchema) -> Arc<ModelSchema> {
        let schema = Arc::new(schema);
        self.models.insert(schema.name.clone(), Arc::clone(&schema));
        schema
    }

    /// Find a schema by model name.
    pub fn get(&self, model: &str) -> Option<Arc<ModelSchema>> {
        self.models.get(model).cloned()
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }
}
