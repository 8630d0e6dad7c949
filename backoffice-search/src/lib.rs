//! Search for the back-office admin.
//!
//! Compiles index page requests (scopes, filters, keyword, ordering and
//! pagination) into SQL over registered model schemas, and runs them.
//!
//! # Modules
//!
//! - [`schema`]: model fields, relationships and the schema registry
//! - [`compiler`]: attribute paths and operations to conditions and joins
//! - [`scope`] / [`filter`]: named refinements offered on the index page
//! - [`params`]: request parameter binding
//! - [`searcher`]: the search pipeline
//! - [`executor`]: statement execution (SQLite with the `sqlite` feature)
//!
//! # Example
//!
//! ```
//! use backoffice_search::{
//!     Field, FieldKind, ModelSchema, SchemaRegistry, SearchConfig, SearchParams, SearchSettings, Searcher,
//! };
//! use sea_query::SqliteQueryBuilder;
//!
//! let mut registry = SchemaRegistry::new();
//! let users = registry.register(
//!     ModelSchema::new("User", "users")
//!         .field(Field::new("ID", "id", FieldKind::Integer).primary())
//!         .field(Field::new("Name", "name", FieldKind::String)),
//! );
//!
//! let config = SearchConfig::new();
//! let settings = SearchSettings::default();
//! let plan = Searcher::new(&users, &config, &registry, &settings).build(&SearchParams::new().with_keyword("jin"));
//!
//! let sql = plan.query.statement().to_string(SqliteQueryBuilder);
//! assert!(sql.contains("LIKE"));
//! ```

pub mod compiler;
pub mod composite;
pub mod error;
pub mod executor;
pub mod filter;
pub mod pagination;
pub mod params;
pub mod query;
pub mod schema;
pub mod scope;
pub mod searcher;

pub use compiler::{CompiledClause, ConditionCompiler, FieldSearch, Operation};
pub use composite::{CompositeKeys, DISABLE_COMPOSITE_PRIMARY_KEY_MODE};
pub use error::{CompileError, SearchError, SearchResult};
pub use executor::{QueryExecutor, Record};
#[cfg(feature = "sqlite")]
pub use executor::SqliteExecutor;
pub use filter::{Filter, FilterArgument, FilterConfig, FilterHandler, FilterKind, FilterValues};
pub use pagination::{page_count, PageDefaults, Pagination, DEFAULT_PAGE_COUNT, PER_PAGE_ALL_LIMIT};
pub use params::{PerPage, SearchParams};
pub use query::SearchQuery;
pub use schema::{Field, FieldKind, JoinTable, KeyPair, ModelSchema, RelationKind, Relationship, SchemaRegistry};
pub use scope::{QueryHandler, Scope, VisiblePredicate};
pub use searcher::{SearchConfig, SearchHandler, SearchPage, SearchPlan, SearchSettings, Searcher};
