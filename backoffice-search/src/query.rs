//! The select statement a search is built on.

use sea_query::{Alias, Condition, Expr, IntoCondition, JoinType, Query, SelectStatement};

use crate::schema::ModelSchema;

/// A select over one model's table that scopes, filters and keyword search
/// refine step by step.
///
/// Joins are tracked by table so that several filters walking the same
/// relationship join it only once.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    table: String,
    statement: SelectStatement,
    joined: Vec<String>,
}

impl SearchQuery {
    /// `SELECT <every schema column> FROM <table>`.
    pub fn new(schema: &ModelSchema) -> Self {
        let mut statement = Query::select();
        statement
            .columns(
                schema
                    .fields()
                    .iter()
                    .map(|f| (Alias::new(&schema.table), Alias::new(&f.column))),
            )
            .from(Alias::new(&schema.table));

        Self {
            table: schema.table.clone(),
            statement,
            joined: Vec::new(),
        }
    }

    /// The base table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// A column of the base table.
    pub fn column(&self, column: &str) -> Expr {
        Expr::col((Alias::new(&self.table), Alias::new(column)))
    }

    /// AND a condition into the WHERE clause.
    pub fn and_where(&mut self, condition: impl IntoCondition) -> &mut Self {
        self.statement.cond_where(condition);
        self
    }

    /// `LEFT JOIN table ON condition`, unless `table` is already joined.
    ///
    /// Joined rows can repeat base rows, so the select turns DISTINCT.
    pub fn left_join(&mut self, table: &str, on: Condition) -> &mut Self {
        if table == self.table || self.joined.iter().any(|t| t == table) {
            return self;
        }
        self.joined.push(table.to_string());
        self.statement
            .join(JoinType::LeftJoin, Alias::new(table), on)
            .distinct();
        self
    }

    /// Tables joined so far, in join order.
    pub fn joined_tables(&self) -> &[String] {
        &self.joined
    }

    /// The statement, for handlers that need the full sea-query API.
    pub fn statement_mut(&mut self) -> &mut SelectStatement {
        &mut self.statement
    }

    /// The statement built so far.
    pub fn statement(&self) -> &SelectStatement {
        &self.statement
    }

    /// Finish into the statement.
    pub fn into_statement(self) -> SelectStatement {
        self.statement
    }
}
