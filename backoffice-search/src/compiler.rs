//! Keyword and filter condition compiler.
//!
//! Turns `(attribute path, operation)` pairs plus a keyword into one OR-ed
//! condition over the base table and the tables its relationships reach.
//! A path like `Company.Name` walks the `Company` relationship and adds the
//! LEFT JOIN it needs; the last segment picks the column and its kind picks
//! the predicate.
//!
//! Paths that don't resolve, and keywords that don't coerce to the field's
//! kind, drop that single condition with a debug log instead of failing the
//! search.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sea_query::{Alias, Condition, Expr, Func, LikeExpr, SimpleExpr};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::CompileError;
use crate::query::SearchQuery;
use crate::schema::{FieldKind, KeyPair, ModelSchema, RelationKind, Relationship, SchemaRegistry};

/// How a keyword is compared with a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operation {
    /// Case-insensitive substring match for strings, equality otherwise
    #[default]
    Contains,
    Equal,
    StartWith,
    EndWith,
    Present,
    Blank,
    /// Keyword is a comma separated list
    In,
    Gt,
    Lt,
}

impl Operation {
    /// Parse an operation name as sent by filter forms.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "" | "contains" => Some(Operation::Contains),
            "equal" | "eq" => Some(Operation::Equal),
            "start_with" => Some(Operation::StartWith),
            "end_with" => Some(Operation::EndWith),
            "present" => Some(Operation::Present),
            "blank" => Some(Operation::Blank),
            "in" => Some(Operation::In),
            "gt" => Some(Operation::Gt),
            "lt" => Some(Operation::Lt),
            _ => None,
        }
    }

    /// Request parameter form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Contains => "contains",
            Operation::Equal => "equal",
            Operation::StartWith => "start_with",
            Operation::EndWith => "end_with",
            Operation::Present => "present",
            Operation::Blank => "blank",
            Operation::In => "in",
            Operation::Gt => "gt",
            Operation::Lt => "lt",
        }
    }

    /// Present/blank checks don't need a keyword.
    pub fn needs_keyword(&self) -> bool {
        !matches!(self, Operation::Present | Operation::Blank)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attribute to search, e.g. `Company.Name` with [`Operation::Contains`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSearch {
    pub path: String,
    pub operation: Operation,
}

impl FieldSearch {
    /// Search `path` with `operation`.
    pub fn new(path: impl Into<String>, operation: Operation) -> Self {
        Self {
            path: path.into(),
            operation,
        }
    }

    /// Substring search on `path`.
    pub fn contains(path: impl Into<String>) -> Self {
        Self::new(path, Operation::Contains)
    }
}

/// Joins and the OR-ed condition compiled from a set of [`FieldSearch`]es.
#[derive(Debug, Clone)]
pub struct CompiledClause {
    joins: Vec<(String, Condition)>,
    condition: Condition,
}

impl CompiledClause {
    /// Add the joins (once per table) and AND the condition into `query`.
    pub fn apply(self, query: &mut SearchQuery) {
        for (table, on) in self.joins {
            query.left_join(&table, on);
        }
        query.and_where(self.condition);
    }

    /// Joined tables, in join order.
    pub fn joined_tables(&self) -> impl Iterator<Item = &str> {
        self.joins.iter().map(|(t, _)| t.as_str())
    }
}

/// A column reached by a path, with the kind its values coerce to.
struct Target {
    table: String,
    column: String,
    kind: FieldKind,
}

/// Compiles field searches against registered schemas.
#[derive(Debug, Clone, Copy)]
pub struct ConditionCompiler<'a> {
    registry: &'a SchemaRegistry,
    time_formats: &'a [String],
}

impl<'a> ConditionCompiler<'a> {
    /// `time_formats` are chrono formats tried after RFC 3339 when a
    /// keyword targets a time field.
    pub fn new(registry: &'a SchemaRegistry, time_formats: &'a [String]) -> Self {
        Self { registry, time_formats }
    }

    /// Compile `fields` against `keyword`.
    ///
    /// Returns `None` when no field produced a condition (including a blank
    /// keyword with only keyword-based operations).
    pub fn compile(&self, schema: &Arc<ModelSchema>, fields: &[FieldSearch], keyword: &str) -> Option<CompiledClause> {
        let mut joins: Vec<(String, Condition)> = Vec::new();
        let mut any = Condition::any();
        let mut compiled = 0;

        for field in fields {
            if keyword.is_empty() && field.operation.needs_keyword() {
                continue;
            }

            let mut field_joins = Vec::new();
            match self.compile_field(schema, field, keyword, &mut field_joins) {
                Ok(condition) => {
                    for (table, on) in field_joins {
                        if !joins.iter().any(|(t, _)| *t == table) {
                            joins.push((table, on));
                        }
                    }
                    any = any.add(condition);
                    compiled += 1;
                }
                Err(err) => {
                    debug!(model = %schema.name, path = %field.path, error = %err, "skipping search condition");
                }
            }
        }

        if compiled == 0 {
            return None;
        }
        Some(CompiledClause { joins, condition: any })
    }

    fn compile_field(
        &self,
        schema: &Arc<ModelSchema>,
        field: &FieldSearch,
        keyword: &str,
        joins: &mut Vec<(String, Condition)>,
    ) -> Result<Condition, CompileError> {
        let segments: Vec<&str> = field.path.split('.').collect();
        let (last, hops) = match segments.split_last() {
            Some(split) => split,
            None => {
                return Err(CompileError::UnknownField {
                    model: schema.name.clone(),
                    field: field.path.clone(),
                })
            }
        };

        let mut current = Arc::clone(schema);
        for hop in hops {
            let relationship = current
                .find_relationship(hop)
                .ok_or_else(|| CompileError::UnknownRelationship {
                    model: current.name.clone(),
                    name: hop.to_string(),
                })?
                .clone();
            let target = self.target_schema(&relationship)?;
            join_relationship(&current, &relationship, &target, joins)?;
            current = target;
        }

        let target = match current.lookup_field(last) {
            Some(f) => Target {
                table: current.table.clone(),
                column: f.column.clone(),
                kind: f.kind,
            },
            None => {
                let relationship = current
                    .find_relationship(last)
                    .ok_or_else(|| CompileError::UnknownField {
                        model: current.name.clone(),
                        field: last.to_string(),
                    })?
                    .clone();
                self.relationship_key(&current, &relationship, joins)?
            }
        };

        predicate(&target, field.operation, keyword, self.time_formats)
    }

    fn target_schema(&self, relationship: &Relationship) -> Result<Arc<ModelSchema>, CompileError> {
        self.registry
            .get(&relationship.target)
            .ok_or_else(|| CompileError::UnknownModel(relationship.target.clone()))
    }

    /// A path ending on a relationship compares the related record's key.
    fn relationship_key(
        &self,
        owner: &ModelSchema,
        relationship: &Relationship,
        joins: &mut Vec<(String, Condition)>,
    ) -> Result<Target, CompileError> {
        let target = self.target_schema(relationship)?;
        let missing = || CompileError::UnknownRelationship {
            model: owner.name.clone(),
            name: relationship.name.clone(),
        };

        match relationship.kind {
            RelationKind::BelongsTo => {
                let key = relationship.keys.first().ok_or_else(missing)?;
                Ok(Target {
                    table: owner.table.clone(),
                    column: key.foreign.clone(),
                    kind: column_kind(owner, &key.foreign),
                })
            }
            RelationKind::HasOne | RelationKind::HasMany => {
                let primary = target.primary_fields().next().ok_or_else(missing)?;
                let found = Target {
                    table: target.table.clone(),
                    column: primary.column.clone(),
                    kind: primary.kind,
                };
                join_relationship(owner, relationship, &target, joins)?;
                Ok(found)
            }
            RelationKind::ManyToMany => {
                let join_table = relationship.join_table.as_ref().ok_or_else(missing)?;
                let key = join_table.target_keys.first().ok_or_else(missing)?;
                joins.push((
                    join_table.table.clone(),
                    key_condition(&join_table.table, &owner.table, &join_table.owner_keys),
                ));
                Ok(Target {
                    table: join_table.table.clone(),
                    column: key.foreign.clone(),
                    kind: column_kind(&target, &key.primary),
                })
            }
        }
    }
}

fn column_kind(schema: &ModelSchema, column: &str) -> FieldKind {
    schema
        .field_by_column(column)
        .map(|f| f.kind)
        .unwrap_or(FieldKind::Integer)
}

/// `foreign_table.foreign = primary_table.primary` for every pair.
fn key_condition(foreign_table: &str, primary_table: &str, keys: &[KeyPair]) -> Condition {
    keys.iter().fold(Condition::all(), |cond, key| {
        cond.add(
            Expr::col((Alias::new(foreign_table), Alias::new(&key.foreign)))
                .equals((Alias::new(primary_table), Alias::new(&key.primary))),
        )
    })
}

fn join_relationship(
    owner: &ModelSchema,
    relationship: &Relationship,
    target: &ModelSchema,
    joins: &mut Vec<(String, Condition)>,
) -> Result<(), CompileError> {
    match relationship.kind {
        RelationKind::BelongsTo => {
            joins.push((target.table.clone(), key_condition(&owner.table, &target.table, &relationship.keys)));
        }
        RelationKind::HasOne | RelationKind::HasMany => {
            joins.push((target.table.clone(), key_condition(&target.table, &owner.table, &relationship.keys)));
        }
        RelationKind::ManyToMany => {
            let join_table = relationship
                .join_table
                .as_ref()
                .ok_or_else(|| CompileError::UnknownRelationship {
                    model: owner.name.clone(),
                    name: relationship.name.clone(),
                })?;
            joins.push((
                join_table.table.clone(),
                key_condition(&join_table.table, &owner.table, &join_table.owner_keys),
            ));
            joins.push((
                target.table.clone(),
                key_condition(&join_table.table, &target.table, &join_table.target_keys),
            ));
        }
    }
    Ok(())
}

fn predicate(target: &Target, operation: Operation, keyword: &str, time_formats: &[String]) -> Result<Condition, CompileError> {
    let col = || Expr::col((Alias::new(&target.table), Alias::new(&target.column)));
    let invalid = || CompileError::InvalidValue {
        kind: target.kind,
        value: keyword.to_string(),
    };

    if target.kind != FieldKind::String {
        match operation {
            Operation::Present => return Ok(Condition::all().add(col().is_not_null())),
            Operation::Blank => return Ok(Condition::all().add(col().is_null())),
            _ => {}
        }
    }

    let expr: SimpleExpr = match target.kind {
        FieldKind::String => {
            let upper = || Expr::expr(Func::upper(col()));
            match operation {
                Operation::Equal => upper().eq(keyword.to_uppercase()),
                Operation::StartWith => {
                    upper().like(LikeExpr::new(format!("{}%", escape_like(&keyword.to_uppercase()))).escape('\\'))
                }
                Operation::EndWith => {
                    upper().like(LikeExpr::new(format!("%{}", escape_like(&keyword.to_uppercase()))).escape('\\'))
                }
                Operation::Present => col().ne(""),
                Operation::Blank => {
                    return Ok(Condition::any().add(col().eq("")).add(col().is_null()));
                }
                Operation::In => upper().is_in(split_list(keyword).map(|v| v.to_uppercase())),
                Operation::Contains | Operation::Gt | Operation::Lt => upper().like(
                    LikeExpr::new(format!("%{}%", escape_like(&keyword.to_uppercase()))).escape('\\'),
                ),
            }
        }
        FieldKind::Integer => {
            if operation == Operation::In {
                let values: Vec<i64> = split_list(keyword).filter_map(|v| v.parse().ok()).collect();
                if values.is_empty() {
                    return Err(invalid());
                }
                col().is_in(values)
            } else {
                let value: i64 = keyword.trim().parse().map_err(|_| invalid())?;
                compare(col(), operation, value)
            }
        }
        FieldKind::Float => {
            if operation == Operation::In {
                let values: Vec<f64> = split_list(keyword).filter_map(|v| v.parse().ok()).collect();
                if values.is_empty() {
                    return Err(invalid());
                }
                col().is_in(values)
            } else {
                let value: f64 = keyword.trim().parse().map_err(|_| invalid())?;
                compare(col(), operation, value)
            }
        }
        FieldKind::Bool => match parse_bool(keyword) {
            Some(value) => col().eq(value),
            None => match keyword {
                "present" => col().is_not_null(),
                "blank" => col().is_null(),
                _ => return Err(invalid()),
            },
        },
        FieldKind::Time => {
            let value = parse_time(keyword, time_formats).ok_or_else(invalid)?;
            compare(col(), operation, value)
        }
    };

    Ok(Condition::all().add(expr))
}

fn compare<V: Into<SimpleExpr>>(col: Expr, operation: Operation, value: V) -> SimpleExpr {
    match operation {
        Operation::Gt => col.gt(value),
        Operation::Lt => col.lt(value),
        _ => col.eq(value),
    }
}

fn split_list(keyword: &str) -> impl Iterator<Item = &str> {
    keyword.split(',').map(str::trim).filter(|v| !v.is_empty())
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `\` as the escape.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// The literals Go-style boolean parsers accept.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// RFC 3339 first, then each format as a datetime, then as a date at
/// midnight UTC.
pub(crate) fn parse_time(s: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, JoinTable};
    use sea_query::SqliteQueryBuilder;

    fn registry() -> (SchemaRegistry, Arc<ModelSchema>) {
        let mut registry = SchemaRegistry::new();
        let user = registry.register(
            ModelSchema::new("User", "users")
                .field(Field::new("ID", "id", FieldKind::Integer).primary())
                .field(Field::new("Name", "name", FieldKind::String))
                .field(Field::new("Age", "age", FieldKind::Integer))
                .field(Field::new("Score", "score", FieldKind::Float))
                .field(Field::new("Active", "active", FieldKind::Bool))
                .field(Field::new("CompanyID", "company_id", FieldKind::Integer))
                .relationship(Relationship::belongs_to("Company", "Company", "company_id", "id"))
                .relationship(Relationship::has_many("Addresses", "Address", "user_id", "id"))
                .relationship(Relationship::many_to_many(
                    "Languages",
                    "Language",
                    JoinTable {
                        table: "user_languages".into(),
                        owner_keys: vec![KeyPair::new("user_id", "id")],
                        target_keys: vec![KeyPair::new("language_id", "id")],
                    },
                )),
        );
        registry.register(
            ModelSchema::new("Company", "companies")
                .field(Field::new("ID", "id", FieldKind::Integer).primary())
                .field(Field::new("Name", "name", FieldKind::String)),
        );
        registry.register(
            ModelSchema::new("Address", "addresses")
                .field(Field::new("ID", "id", FieldKind::Integer).primary())
                .field(Field::new("UserID", "user_id", FieldKind::Integer))
                .field(Field::new("City", "city", FieldKind::String)),
        );
        registry.register(
            ModelSchema::new("Language", "languages")
                .field(Field::new("ID", "id", FieldKind::Integer).primary())
                .field(Field::new("Name", "name", FieldKind::String)),
        );
        (registry, user)
    }

    fn sql(fields: &[FieldSearch], keyword: &str) -> Option<String> {
        let (registry, user) = registry();
        let compiler = ConditionCompiler::new(&registry, &[]);
        let clause = compiler.compile(&user, fields, keyword)?;
        let mut query = SearchQuery::new(&ModelSchema::new("User", "users").field(Field::new("ID", "id", FieldKind::Integer)));
        clause.apply(&mut query);
        Some(query.statement().to_string(SqliteQueryBuilder))
    }

    #[test]
    fn test_string_contains_is_case_insensitive() {
        let sql = sql(&[FieldSearch::contains("Name")], "abc").unwrap();
        assert!(sql.contains(r#"UPPER("users"."name") LIKE '%ABC%'"#), "{sql}");
    }

    #[test]
    fn test_string_prefix_and_suffix_are_case_insensitive() {
        let sql = sql(&[FieldSearch::new("Name", Operation::StartWith)], "abc").unwrap();
        assert!(sql.contains(r#"UPPER("users"."name") LIKE 'ABC%'"#), "{sql}");

        let sql = self::sql(&[FieldSearch::new("Name", Operation::EndWith)], "Son").unwrap();
        assert!(sql.contains(r#"UPPER("users"."name") LIKE '%SON'"#), "{sql}");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_fields_are_ored() {
        let sql = sql(&[FieldSearch::contains("Name"), FieldSearch::contains("Company.Name")], "acme").unwrap();
        assert!(sql.contains(" OR "), "{sql}");
        assert!(sql.contains(r#"LEFT JOIN "companies" ON "users"."company_id" = "companies"."id""#), "{sql}");
    }

    #[test]
    fn test_unparsable_integer_is_skipped() {
        assert!(sql(&[FieldSearch::contains("Age")], "abc").is_none());
        let sql = sql(&[FieldSearch::contains("Age"), FieldSearch::contains("Name")], "abc").unwrap();
        assert!(!sql.contains("age"), "{sql}");
    }

    #[test]
    fn test_number_operations() {
        let gt = sql(&[FieldSearch::new("Age", Operation::Gt)], "18").unwrap();
        assert!(gt.contains(r#""users"."age" > 18"#), "{gt}");
        let list = sql(&[FieldSearch::new("Age", Operation::In)], "1, 2,x").unwrap();
        assert!(list.contains(r#""users"."age" IN (1, 2)"#), "{list}");
        let score = sql(&[FieldSearch::new("Score", Operation::Lt)], "2.5").unwrap();
        assert!(score.contains(r#""users"."score" < 2.5"#), "{score}");
    }

    #[test]
    fn test_bool_tokens() {
        let t = sql(&[FieldSearch::contains("Active")], "True").unwrap();
        assert!(t.contains(r#""users"."active" = "#), "{t}");
        let blank = sql(&[FieldSearch::contains("Active")], "blank").unwrap();
        assert!(blank.contains(r#""users"."active" IS NULL"#), "{blank}");
        assert!(sql(&[FieldSearch::contains("Active")], "maybe").is_none());
    }

    #[test]
    fn test_string_blank_and_present() {
        let blank = sql(&[FieldSearch::new("Name", Operation::Blank)], "").unwrap();
        assert!(blank.contains(r#""users"."name" = '' OR "users"."name" IS NULL"#), "{blank}");
        let present = sql(&[FieldSearch::new("Name", Operation::Present)], "").unwrap();
        assert!(present.contains(r#""users"."name" <> ''"#), "{present}");
    }

    #[test]
    fn test_unknown_paths_are_skipped() {
        assert!(sql(&[FieldSearch::contains("Nickname")], "x").is_none());
        assert!(sql(&[FieldSearch::contains("Team.Name")], "x").is_none());
    }

    #[test]
    fn test_has_many_join() {
        let sql = sql(&[FieldSearch::contains("Addresses.City")], "paris").unwrap();
        assert!(sql.contains(r#"LEFT JOIN "addresses" ON "addresses"."user_id" = "users"."id""#), "{sql}");
    }

    #[test]
    fn test_many_to_many_joins_through_join_table() {
        let sql = sql(&[FieldSearch::new("Languages.Name", Operation::Equal)], "fr").unwrap();
        assert!(
            sql.contains(r#"LEFT JOIN "user_languages" ON "user_languages"."user_id" = "users"."id""#),
            "{sql}"
        );
        assert!(
            sql.contains(r#"LEFT JOIN "languages" ON "user_languages"."language_id" = "languages"."id""#),
            "{sql}"
        );
        assert!(sql.contains(r#"UPPER("languages"."name") = 'FR'"#), "{sql}");
    }

    #[test]
    fn test_terminal_relationship_uses_keys() {
        let belongs = sql(&[FieldSearch::new("Company", Operation::In)], "1,2").unwrap();
        assert!(belongs.contains(r#""users"."company_id" IN (1, 2)"#), "{belongs}");
        assert!(!belongs.contains("JOIN"), "{belongs}");

        let many = sql(&[FieldSearch::new("Languages", Operation::In)], "3").unwrap();
        assert!(many.contains(r#""user_languages"."language_id" IN (3)"#), "{many}");
        assert!(!many.contains(r#"JOIN "languages""#), "{many}");
    }

    #[test]
    fn test_parse_time_formats() {
        let formats = vec!["%Y-%m-%d %H:%M".to_string(), "%Y-%m-%d".to_string()];
        let dt = parse_time("2024-03-01 10:30", &formats).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:30:00+00:00");
        let date = parse_time("2024-03-01", &formats).unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(parse_time("yesterday", &formats).is_none());
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!(Operation::parse("eq"), Some(Operation::Equal));
        assert_eq!(Operation::parse(""), Some(Operation::Contains));
        assert_eq!(Operation::parse("between"), None);
    }
}
