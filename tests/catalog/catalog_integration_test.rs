//! Compiling against link catalogs stored in SQLite and JSON files.

use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;
use tablelink::catalog::{
    CachedLinkProvider, CatalogError, JsonLinkProvider, LinkProvider, SqliteLinkProvider,
};
use tablelink::compile::{CompileError, CompileOptions, Compiler, ErrorClass};
use tablelink::request::QueryRequest;

/// Catalog laid out like the original export: tuple-style column lists,
/// one scope per grid configuration.
fn grid_catalog() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "
        CREATE TABLE join_links (
            scope TEXT NOT NULL,
            left_table TEXT,
            right_table TEXT,
            left_columns TEXT,
            right_columns TEXT
        );
        INSERT INTO join_links VALUES
            ('enrollment', 'enrollment_fact', 'enrollment_term_dim', '(term_id,)', '(term_id,)'),
            ('enrollment', 'enrollment_fact', 'student_dim', 'student_id', 'student_id'),
            ('enrollment', 'student_dim', 'college_dim', 'college_id,campus_id', 'college_id,campus_id'),
            ('awards', 'award_fact', 'student_dim', 'student_id', 'student_id');
        ",
    )
    .unwrap();
    conn
}

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tablelink-catalog-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn request() -> QueryRequest {
    QueryRequest::from_json(
        r#"{
            "dimensionData": [{"table": "college_dim", "columns": "college_name", "aliasName": "College"}],
            "measureData": [{"table": "enrollment_fact", "columns": "headcount", "operator": "sum", "aliasName": "Heads"}]
        }"#,
    )
    .unwrap()
}

#[test]
fn test_scoped_sqlite_catalog() {
    let provider = SqliteLinkProvider::from_connection(grid_catalog()).with_scope("enrollment");
    let links = provider.load_links().unwrap();
    assert_eq!(links.len(), 3);
    assert_eq!(links[0].left_columns, vec!["term_id"]);
    assert_eq!(links[2].right_columns, vec!["college_id", "campus_id"]);

    let compiler = Compiler::new(provider, CompileOptions::default());
    let compiled = compiler.compile(&request()).unwrap();

    assert_eq!(compiled.path.len(), 2);
    assert!(compiled.path.contains_pair("enrollment_fact", "student_dim"));
    assert!(compiled.path.contains_pair("student_dim", "college_dim"));
    assert!(compiled.sql.contains(
        "ON \"college_dim\".\"college_id\" = \"student_dim\".\"college_id\" AND \"college_dim\".\"campus_id\" = \"student_dim\".\"campus_id\""
    ) || compiled.sql.contains(
        "ON \"student_dim\".\"college_id\" = \"college_dim\".\"college_id\" AND \"student_dim\".\"campus_id\" = \"college_dim\".\"campus_id\""
    ));
}

#[test]
fn test_scope_hides_other_grids() {
    let provider = SqliteLinkProvider::from_connection(grid_catalog()).with_scope("awards");
    let compiler = Compiler::new(provider, CompileOptions::default());

    let err = compiler.compile(&request()).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Connectivity);
}

#[test]
fn test_custom_query_shape_is_checked() {
    let provider = SqliteLinkProvider::from_connection(grid_catalog())
        .with_query("SELECT left_table, right_table FROM join_links");
    let compiler = Compiler::new(provider, CompileOptions::default());

    let err = compiler.compile(&request()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Catalog(CatalogError::QueryShape { found: 2 })
    ));
    assert_eq!(err.class(), ErrorClass::Configuration);
}

#[test]
fn test_cached_provider_serves_first_load() {
    let conn = grid_catalog();
    let provider = CachedLinkProvider::new(
        SqliteLinkProvider::from_connection(conn).with_scope("enrollment"),
    );
    assert!(!provider.is_loaded());

    let compiler = Compiler::new(provider, CompileOptions::default());
    let first = compiler.compile(&request()).unwrap();
    assert!(compiler.provider().is_loaded());

    let second = compiler.compile(&request()).unwrap();
    assert_eq!(first.sql, second.sql);
}

#[test]
fn test_json_catalog_with_original_column_names() {
    let path = scratch_file(
        "links.json",
        r#"[
            {"lefttablename": "enrollment_fact", "righttablename": "student_dim",
             "leftcolumnnames": "student_id", "rightcolumnnames": "student_id"},
            {"leftTable": "student_dim", "rightTable": "college_dim",
             "leftColumns": ["college_id", "campus_id"], "rightColumns": ["college_id", "campus_id"]}
        ]"#,
    );

    let compiler = Compiler::new(JsonLinkProvider::new(&path), CompileOptions::default());
    let compiled = compiler.compile(&request()).unwrap();
    assert_eq!(compiled.path.len(), 2);

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_json_catalog() {
    let provider = JsonLinkProvider::new("/nonexistent/tablelink/links.json");
    let err = provider.load_links().unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
}
