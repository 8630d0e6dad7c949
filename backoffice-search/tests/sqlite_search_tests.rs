//! Search integration tests
//!
//! Runs the search pipeline against an in-memory SQLite database holding
//! users with companies, addresses, a profile and languages.

use backoffice_search::{
    Field, FieldKind, Filter, FilterKind, FilterValues, JoinTable, KeyPair, ModelSchema, Record, Relationship,
    SchemaRegistry, Scope, SearchConfig, SearchError, SearchParams, SearchSettings, Searcher, SqliteExecutor,
};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;

const SETUP: &str = r#"
CREATE TABLE companies (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    state TEXT NOT NULL,
    age INTEGER NOT NULL,
    active BOOLEAN NOT NULL,
    company_id INTEGER
);
CREATE TABLE addresses (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, city TEXT NOT NULL);
CREATE TABLE profiles (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, bio TEXT NOT NULL);
CREATE TABLE languages (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE user_languages (user_id INTEGER NOT NULL, language_id INTEGER NOT NULL);
CREATE TABLE variations (
    id INTEGER NOT NULL,
    locale_code TEXT NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (id, locale_code)
);

INSERT INTO companies VALUES (1, 'Acme'), (2, 'Globex');
INSERT INTO users VALUES
    (1, 'ABC', 'admin', 'active', 30, 1, 1),
    (2, 'xabcx', 'manager', 'archived', 40, 0, 2),
    (3, 'xyz', 'member', 'active', 25, 1, 1),
    (4, 'Dora', 'admin', 'active', 52, 1, NULL);
INSERT INTO addresses VALUES (1, 1, 'Paris'), (2, 1, 'Lyon'), (3, 3, 'Paris');
INSERT INTO profiles VALUES (1, 2, 'likes rust');
INSERT INTO languages VALUES (1, 'English'), (2, 'French');
INSERT INTO user_languages VALUES (1, 1), (1, 2), (2, 2);
INSERT INTO variations VALUES (1, 'en', 'Shirt'), (1, 'fr', 'Chemise');
"#;

struct Fixture {
    registry: SchemaRegistry,
    users: Arc<ModelSchema>,
    variations: Arc<ModelSchema>,
    executor: SqliteExecutor,
    settings: SearchSettings,
}

impl Fixture {
    async fn new() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(SETUP).execute(&pool).await.unwrap();

        let mut registry = SchemaRegistry::new();
        let users = registry.register(
            ModelSchema::new("User", "users")
                .field(Field::new("ID", "id", FieldKind::Integer).primary())
                .field(Field::new("Name", "name", FieldKind::String))
                .field(Field::new("Role", "role", FieldKind::String))
                .field(Field::new("State", "state", FieldKind::String))
                .field(Field::new("Age", "age", FieldKind::Integer))
                .field(Field::new("Active", "active", FieldKind::Bool))
                .field(Field::new("CompanyID", "company_id", FieldKind::Integer))
                .relationship(Relationship::belongs_to("Company", "Company", "company_id", "id"))
                .relationship(Relationship::has_many("Addresses", "Address", "user_id", "id"))
                .relationship(Relationship::has_one("Profile", "Profile", "user_id", "id"))
                .relationship(Relationship::many_to_many(
                    "Languages",
                    "Language",
                    JoinTable {
                        table: "user_languages".to_string(),
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
            ModelSchema::new("Profile", "profiles")
                .field(Field::new("ID", "id", FieldKind::Integer).primary())
                .field(Field::new("UserID", "user_id", FieldKind::Integer))
                .field(Field::new("Bio", "bio", FieldKind::String)),
        );
        registry.register(
            ModelSchema::new("Language", "languages")
                .field(Field::new("ID", "id", FieldKind::Integer).primary())
                .field(Field::new("Name", "name", FieldKind::String)),
        );
        let variations = registry.register(
            ModelSchema::new("Variation", "variations")
                .field(Field::new("ID", "id", FieldKind::Integer).primary())
                .field(Field::new("LocaleCode", "locale_code", FieldKind::String).primary())
                .field(Field::new("Name", "name", FieldKind::String)),
        );

        Self {
            registry,
            users,
            variations,
            executor: SqliteExecutor::new(pool),
            settings: SearchSettings::default(),
        }
    }

    async fn search(&self, config: &SearchConfig, params: SearchParams) -> (u64, Vec<String>) {
        let page = Searcher::new(&self.users, config, &self.registry, &self.settings)
            .find(&self.executor, &params)
            .await
            .unwrap();
        (page.pagination.total, names(&page.records))
    }
}

fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r["Name"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn by_id() -> SearchParams {
    SearchParams::new().with_order_by("ID")
}

#[tokio::test]
async fn test_keyword_is_case_insensitive_substring() {
    let fx = Fixture::new().await;
    let (total, found) = fx.search(&SearchConfig::new(), by_id().with_keyword("abc")).await;
    assert_eq!(total, 2);
    assert_eq!(found, ["ABC", "xabcx"]);
}

#[tokio::test]
async fn test_keyword_over_has_many_is_distinct() {
    let fx = Fixture::new().await;
    let mut config = SearchConfig::new();
    config.set_search_attrs(["Addresses.City"]);

    let (total, found) = fx.search(&config, by_id().with_keyword("a")).await;
    assert_eq!(total, 2);
    assert_eq!(found, ["ABC", "xyz"]);
}

#[tokio::test]
async fn test_number_filter_operation() {
    let fx = Fixture::new().await;
    let mut config = SearchConfig::new();
    config.add_filter(Filter::new("Age").with_kind(FilterKind::Number));

    let params = SearchParams::from_query_pairs([
        ("filters[Age].Value", "28"),
        ("filters[Age].Operation", "gt"),
        ("order_by", "ID"),
    ]);
    let (total, found) = fx.search(&config, params).await;
    assert_eq!(total, 3);
    assert_eq!(found, ["ABC", "xabcx", "Dora"]);
}

#[tokio::test]
async fn test_string_prefix_and_suffix_filters_ignore_case() {
    let fx = Fixture::new().await;
    let mut config = SearchConfig::new();
    config.add_filter(Filter::new("Name"));

    let params = SearchParams::from_query_pairs([
        ("filters[Name].Value", "a"),
        ("filters[Name].Operation", "start_with"),
    ]);
    let (_, found) = fx.search(&config, params).await;
    assert_eq!(found, ["ABC"]);

    let params = SearchParams::from_query_pairs([
        ("filters[Name].Value", "RA"),
        ("filters[Name].Operation", "end_with"),
    ]);
    let (_, found) = fx.search(&config, params).await;
    assert_eq!(found, ["Dora"]);
}

#[tokio::test]
async fn test_select_many_filter() {
    let fx = Fixture::new().await;
    let mut config = SearchConfig::new();
    config.add_filter(Filter::new("Role").with_kind(FilterKind::SelectMany));

    let params = SearchParams::from_query_pairs([
        ("filters[Role].Value[]", "manager"),
        ("filters[Role].Value[]", "member"),
        ("order_by", "ID"),
    ]);
    let (_, found) = fx.search(&config, params).await;
    assert_eq!(found, ["xabcx", "xyz"]);
}

#[tokio::test]
async fn test_boolean_filter_and_keyword_combine() {
    let fx = Fixture::new().await;
    let mut config = SearchConfig::new();
    config.add_filter(Filter::new("Active").with_kind(FilterKind::Boolean));

    let params = SearchParams::from_query_pairs([("filters[Active].Value", "true"), ("keyword", "x")]);
    let (total, found) = fx.search(&config, params).await;
    assert_eq!(total, 1);
    assert_eq!(found, ["xyz"]);
}

#[tokio::test]
async fn test_relationship_filters() {
    let fx = Fixture::new().await;
    let mut config = SearchConfig::new();
    config.add_filter(Filter::new("Company.Name"));
    config.add_filter(Filter::new("Languages").with_kind(FilterKind::SelectOne));
    config.add_filter(Filter::new("Profile.Bio"));

    let (_, found) = fx
        .search(&config, by_id().with_filter("Company.Name", FilterValues::single("acme")))
        .await;
    assert_eq!(found, ["ABC", "xyz"]);

    let (_, found) = fx.search(&config, by_id().with_filter("Languages", FilterValues::single("2"))).await;
    assert_eq!(found, ["ABC", "xabcx"]);

    let (_, found) = fx.search(&config, by_id().with_filter("Profile.Bio", FilterValues::single("RUST"))).await;
    assert_eq!(found, ["xabcx"]);
}

#[tokio::test]
async fn test_scopes() {
    let fx = Fixture::new().await;
    let state = |name: &str, value: &'static str| {
        Scope::new(name, move |q| {
            let col = q.column("state");
            q.and_where(col.eq(value));
        })
        .in_group("State")
    };
    let mut config = SearchConfig::new();
    config.add_scope(state("Active", "active").as_default());
    config.add_scope(state("Archived", "archived"));
    config.add_scope(Scope::new("Admins", |q| {
        let col = q.column("role");
        q.and_where(col.eq("admin"));
    }));

    let (total, _) = fx.search(&config, by_id()).await;
    assert_eq!(total, 3);

    let (_, found) = fx.search(&config, by_id().with_scope("Archived")).await;
    assert_eq!(found, ["xabcx"]);

    let (_, found) = fx.search(&config, by_id().with_scope("Admins")).await;
    assert_eq!(found, ["ABC", "Dora"]);
}

#[tokio::test]
async fn test_order_by_desc() {
    let fx = Fixture::new().await;
    let (_, found) = fx
        .search(&SearchConfig::new(), SearchParams::new().with_order_by("Age_desc"))
        .await;
    assert_eq!(found, ["Dora", "xabcx", "ABC", "xyz"]);
}

#[tokio::test]
async fn test_pagination() {
    let fx = Fixture::new().await;
    let params = SearchParams::from_query_pairs([("per_page", "3"), ("page", "2"), ("order_by", "ID")]);
    let page = Searcher::new(&fx.users, &SearchConfig::new(), &fx.registry, &fx.settings)
        .find(&fx.executor, &params)
        .await
        .unwrap();

    assert_eq!(page.pagination.total, 4);
    assert_eq!(page.pagination.pages, 2);
    assert_eq!(page.pagination.current_page, Some(2));
    assert_eq!(names(&page.records), ["Dora"]);
}

#[tokio::test]
async fn test_negative_page_returns_everything() {
    let fx = Fixture::new().await;
    let params = SearchParams::from_query_pairs([("per_page", "1"), ("page", "-1")]);
    let (total, found) = fx.search(&SearchConfig::new(), params).await;
    assert_eq!(total, 4);
    assert_eq!(found.len(), 4);
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let fx = Fixture::new().await;
    let params = SearchParams::from_query_pairs([("page", "9223372036854775807")]);
    let (total, found) = fx.search(&SearchConfig::new(), params).await;
    assert_eq!(total, 4);
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_records_are_keyed_by_field_name() {
    let fx = Fixture::new().await;
    let params = by_id().with_limit(1);
    let page = Searcher::new(&fx.users, &SearchConfig::new(), &fx.registry, &fx.settings)
        .find(&fx.executor, &params)
        .await
        .unwrap();

    let first = &page.records[0];
    assert_eq!(first["ID"], json!(1));
    assert_eq!(first["Active"], json!(true));
    assert_eq!(first["CompanyID"], json!(1));

    let dora = fx.search(&SearchConfig::new(), SearchParams::new().with_keyword("dora")).await;
    assert_eq!(dora.1, ["Dora"]);
}

#[tokio::test]
async fn test_find_one() {
    let fx = Fixture::new().await;
    let config = SearchConfig::new();
    let searcher = Searcher::new(&fx.users, &config, &fx.registry, &fx.settings);

    let record = searcher.find_one(&fx.executor, "3", &SearchParams::new()).await.unwrap();
    assert_eq!(record["Name"], json!("xyz"));

    let err = searcher.find_one(&fx.executor, "99", &SearchParams::new()).await.unwrap_err();
    assert!(matches!(err, SearchError::NotFound(_)));
}

#[tokio::test]
async fn test_find_one_with_composite_key() {
    let fx = Fixture::new().await;
    let config = SearchConfig::new();
    let searcher = Searcher::new(&fx.variations, &config, &fx.registry, &fx.settings);

    let params = SearchParams::from_query_pairs([("primary_key[variations_locale_code]", "fr")]);
    let record = searcher.find_one(&fx.executor, "1", &params).await.unwrap();
    assert_eq!(record["Name"], json!("Chemise"));

    let params = SearchParams::from_query_pairs([("primary_key[variations_locale_code]", "de")]);
    assert!(searcher.find_one(&fx.executor, "1", &params).await.is_err());
}
