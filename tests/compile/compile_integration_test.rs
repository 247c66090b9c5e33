//! Integration tests for the end-to-end request → SQL compilation pipeline.
//!
//! Every generated statement is parsed back with sqlparser for the target
//! dialect.

use sqlparser::parser::Parser;
use tablelink::assemble::AssemblyError;
use tablelink::catalog::{LinkRecord, StaticLinkProvider};
use tablelink::compile::{compile, CompileError, CompileOptions, Compiler, ErrorClass};
use tablelink::filter::FilterError;
use tablelink::graph::{GraphError, JoinEdge, NoPathReason};
use tablelink::request::QueryRequest;
use tablelink::sql::Dialect;

fn validate(sql: &str, dialect: Dialect) {
    let parser_dialect = dialect.parser_dialect();
    if let Err(e) = Parser::parse_sql(&*parser_dialect, sql) {
        panic!("{} rejected generated SQL: {}\n{}", dialect, e, sql);
    }
}

fn request(json: &str) -> QueryRequest {
    QueryRequest::from_json(json).unwrap()
}

fn enrollment_links() -> Vec<LinkRecord> {
    vec![LinkRecord::new(
        "enrollment_fact",
        "enrollment_term_dim",
        &["term_id"],
        &["term_id"],
    )]
}

fn chain_links() -> Vec<LinkRecord> {
    vec![
        LinkRecord::new("a", "b", &["b_id"], &["b_id"]),
        LinkRecord::new("b", "c", &["c_id"], &["c_id"]),
    ]
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_two_linked_tables() {
    let req = request(
        r#"{
            "dimensionData": [{"table": "enrollment_term_dim", "columns": "term_year", "aliasName": "Year"}],
            "measureData": [{"table": "enrollment_fact", "columns": "headcount", "operator": "sum", "aliasName": "Heads"}]
        }"#,
    );

    let compiled = compile(&req, &enrollment_links(), &CompileOptions::default()).unwrap();

    assert_eq!(
        compiled.path.edges,
        vec![JoinEdge::new("enrollment_fact", "enrollment_term_dim")]
    );
    assert_eq!(compiled.sql.matches("INNER JOIN").count(), 1);
    insta::assert_snapshot!(&compiled.sql, @r#"
SELECT
  "enrollment_term_dim"."Year",
  "enrollment_fact"."Heads"
FROM (
  (
    SELECT
      SUM("enrollment_fact"."headcount") AS "Heads",
      "enrollment_fact"."term_id" AS "term_id"
    FROM "enrollment_fact"
    GROUP BY "enrollment_fact"."term_id"
  ) AS "enrollment_fact"
  INNER JOIN (
    SELECT
      "enrollment_term_dim"."term_year" AS "Year",
      "enrollment_term_dim"."term_id" AS "term_id"
    FROM "enrollment_term_dim"
  ) AS "enrollment_term_dim" ON "enrollment_fact"."term_id" = "enrollment_term_dim"."term_id"
)
"#);
    validate(&compiled.sql, Dialect::Postgres);
}

#[test]
fn test_single_table_needs_no_links() {
    let req = request(
        r#"{
            "schemaName": "dbo",
            "dimensionData": [{"table": "students", "columns": "name", "aliasName": "Name"}]
        }"#,
    );

    let options = CompileOptions::default().with_dialect(Dialect::TSql);
    let compiled = compile(&req, &[], &options).unwrap();

    assert!(compiled.path.is_empty());
    assert!(!compiled.sql.contains("JOIN"));
    insta::assert_snapshot!(&compiled.sql, @r#"
SELECT
  [students].[Name]
FROM (
  SELECT
    [students].[name] AS [Name]
  FROM [dbo].[students]
) AS [students]
"#);
    validate(&compiled.sql, Dialect::TSql);
}

#[test]
fn test_disconnected_tables() {
    let links = vec![
        LinkRecord::new("orders", "customers", &["customer_id"], &["customer_id"]),
        LinkRecord::new("inventory", "warehouses", &["warehouse_id"], &["warehouse_id"]),
    ];
    let req = request(
        r#"{"dimensionData": [
            {"table": "orders", "columns": "order_id"},
            {"table": "inventory", "columns": "sku"}
        ]}"#,
    );

    let err = compile(&req, &links, &CompileOptions::default()).unwrap_err();
    match &err {
        CompileError::Graph(GraphError::NoPath {
            reason: NoPathReason::Disconnected { from, to },
        }) => {
            assert_eq!(from, "orders");
            assert_eq!(to, "inventory");
        }
        other => panic!("expected disconnected path, got {:?}", other),
    }
    assert_eq!(err.class(), ErrorClass::Connectivity);
}

#[test]
fn test_three_table_chain() {
    let req = request(
        r#"{"dimensionData": [
            {"table": "a", "columns": "x", "aliasName": "X"},
            {"table": "b", "columns": "y", "aliasName": "Y"},
            {"table": "c", "columns": "z", "aliasName": "Z"}
        ]}"#,
    );

    let compiled = compile(&req, &chain_links(), &CompileOptions::default()).unwrap();

    assert_eq!(compiled.path.len(), 2);
    assert!(compiled.path.contains_pair("a", "b"));
    assert!(compiled.path.contains_pair("b", "c"));
    assert!(!compiled.path.contains_pair("a", "c"));

    let sql = &compiled.sql;
    assert_eq!(sql.matches("INNER JOIN").count(), 2);
    let a = sql.find(") AS \"a\"").unwrap();
    let b = sql.find(") AS \"b\"").unwrap();
    let c = sql.find(") AS \"c\"").unwrap();
    assert!(a < b && b < c, "joins out of order:\n{}", sql);
    assert!(sql.contains("ON \"a\".\"b_id\" = \"b\".\"b_id\""));
    assert!(sql.contains("ON \"b\".\"c_id\" = \"c\".\"c_id\""));
    assert!(!sql.contains("\"a\".\"b_id\" = \"c\""));

    for dialect in [Dialect::Postgres, Dialect::DuckDb, Dialect::MySql, Dialect::TSql] {
        let options = CompileOptions::default().with_dialect(dialect);
        let compiled = compile(&req, &chain_links(), &options).unwrap();
        validate(&compiled.sql, dialect);
    }
}

// ============================================================================
// Requests
// ============================================================================

#[test]
fn test_filter_pulls_in_table_and_column() {
    let req = request(
        r#"{
            "dimensionData": [{"table": "a", "columns": "x", "aliasName": "X"}],
            "conditionData": "c.region = 'West' AND (c.active = 1 OR c.region IS NULL)"
        }"#,
    );

    let compiled = compile(&req, &chain_links(), &CompileOptions::default()).unwrap();

    // The filter drags c in, and b with it.
    assert_eq!(compiled.path.len(), 2);
    assert_eq!(compiled.columns.len(), 1);
    assert!(compiled.sql.contains("\"c\".\"region\" AS \"region\""));
    assert!(compiled.sql.contains("\"c\".\"active\" AS \"active\""));
    assert!(compiled
        .sql
        .ends_with("WHERE c.region = 'West' AND (c.active = 1 OR c.region IS NULL)"));
    validate(&compiled.sql, Dialect::Postgres);
}

#[test]
fn test_multi_column_entries() {
    let req = request(
        r#"{
            "dimensionData": [{"table": "enrollment_term_dim", "columns": "term_year$&term_name", "aliasName": "Term"}],
            "measureData": [
                {"table": "enrollment_fact", "columns": "enrollment_fact.headcount", "operator2": "Count_Distinct", "aliasName": "Students"}
            ]
        }"#,
    );

    let compiled = compile(&req, &enrollment_links(), &CompileOptions::default()).unwrap();

    let aliases: Vec<_> = compiled.columns.iter().map(|c| c.alias.as_str()).collect();
    assert_eq!(aliases, vec!["Term_term_year", "Term_term_name", "Students"]);
    assert!(compiled
        .sql
        .contains("COUNT(DISTINCT \"enrollment_fact\".\"headcount\") AS \"Students\""));
    validate(&compiled.sql, Dialect::Postgres);
}

#[test]
fn test_unknown_operator_is_client_error() {
    let req = request(
        r#"{"measureData": [{"table": "enrollment_fact", "columns": "headcount", "operator": "median"}]}"#,
    );
    let err = compile(&req, &enrollment_links(), &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::InvalidRequest(_)));
    assert_eq!(err.class(), ErrorClass::Client);
}

#[test]
fn test_malformed_link_is_configuration_error() {
    let links = vec![LinkRecord::new("a", "b", &["x", "y"], &["x"])];
    let req = request(r#"{"dimensionData": [{"table": "a", "columns": "x"}, {"table": "b", "columns": "x"}]}"#);

    let err = compile(&req, &links, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::Graph(GraphError::Construction { .. })));
    assert_eq!(err.class(), ErrorClass::Configuration);
}

// ============================================================================
// Filters and aliases
// ============================================================================

#[test]
fn test_filter_alone_selects_nothing() {
    let req = request(r#"{"conditionData": "a.x = 'ax'"}"#);

    let err = compile(&req, &chain_links(), &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::Assembly(AssemblyError::NoOutputColumns)));
    assert_eq!(err.class(), ErrorClass::Client);
}

#[test]
fn test_schema_qualified_filter_column_rejected() {
    let req = request(
        r#"{
            "dimensionData": [{"table": "a", "columns": "x", "aliasName": "X"}],
            "conditionData": "main.a.x = 'ax'"
        }"#,
    );

    let err = compile(&req, &chain_links(), &CompileOptions::default()).unwrap_err();
    match &err {
        CompileError::Filter(FilterError::OverQualifiedColumn { reference }) => {
            assert_eq!(reference, "main.a.x")
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.class(), ErrorClass::Client);
}

#[test]
fn test_unaliased_measures_beside_join_keys_and_filter_columns() {
    let req = request(
        r#"{
            "dimensionData": [{"table": "a", "columns": "x", "aliasName": "X"}],
            "measureData": [
                {"table": "b", "columns": "b_id", "operator": "count", "aliasName": ""},
                {"table": "c", "columns": "units", "operator": "sum"}
            ],
            "conditionData": "c.units > 1"
        }"#,
    );

    for dialect in Dialect::ALL {
        let options = CompileOptions::default().with_dialect(dialect);
        let compiled = compile(&req, &chain_links(), &options).unwrap();

        let aliases: Vec<_> = compiled.columns.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(aliases, vec!["X", "count_b_id", "sum_units"]);
        validate(&compiled.sql, dialect);
    }

    let sql = compile(&req, &chain_links(), &CompileOptions::default())
        .unwrap()
        .sql;
    assert!(sql.contains("COUNT(\"b\".\"b_id\") AS \"count_b_id\""));
    assert!(sql.contains("\"b\".\"b_id\" AS \"b_id\""));
    assert!(sql.contains("SUM(\"c\".\"units\") AS \"sum_units\""));
    assert!(sql.contains("\"c\".\"units\" AS \"units\""));
}

#[test]
fn test_alias_differing_only_in_case_from_filter_column() {
    let req = request(
        r#"{
            "dimensionData": [{"table": "a", "columns": "x", "aliasName": "X"}],
            "conditionData": "a.x = 'ax'"
        }"#,
    );

    for dialect in Dialect::ALL {
        let options = CompileOptions::default().with_dialect(dialect);
        let sql = compile(&req, &chain_links(), &options).unwrap().sql;

        // Postgres keeps "X" and "x" apart; the others see one column.
        let expected = if dialect == Dialect::Postgres { 3 } else { 2 };
        assert_eq!(sql.matches(" AS ").count(), expected, "{}:\n{}", dialect, sql);
        validate(&sql, dialect);
    }
}

#[test]
fn test_mixed_case_filter_on_postgres() {
    let req = request(
        r#"{
            "dimensionData": [{"table": "a", "columns": "x", "aliasName": "X"}],
            "conditionData": "A.Region = 'West' AND a.\"Code\" = 'W1'"
        }"#,
    );

    let compiled = compile(&req, &chain_links(), &CompileOptions::default()).unwrap();
    let sql = &compiled.sql;

    assert!(sql.contains("\"a\".\"region\" AS \"region\""));
    assert!(sql.contains("\"a\".\"Code\" AS \"Code\""));
    assert!(!sql.contains("\"Region\""));
    assert!(sql.ends_with("WHERE A.Region = 'West' AND a.\"Code\" = 'W1'"));
    validate(sql, Dialect::Postgres);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_repeated_compiles_are_identical() {
    let links = vec![
        LinkRecord::new("fact", "term_dim", &["term_id"], &["term_id"]),
        LinkRecord::new("fact", "student_dim", &["student_id"], &["student_id"]),
        LinkRecord::new("fact", "course_dim", &["course_id"], &["course_id"]),
        LinkRecord::new("course_dim", "dept_dim", &["dept_id"], &["dept_id"]),
        LinkRecord::new("student_dim", "dept_dim", &["major_dept_id"], &["dept_id"]),
    ];
    let req = request(
        r#"{
            "dimensionData": [
                {"table": "dept_dim", "columns": "dept_name", "aliasName": "Dept"},
                {"table": "term_dim", "columns": "term_year", "aliasName": "Year"}
            ],
            "measureData": [{"table": "fact", "columns": "units", "operator": "sum", "aliasName": "Units"}],
            "conditionData": "student_dim.level = 'UG'"
        }"#,
    );
    let compiler = Compiler::new(StaticLinkProvider::new(links), CompileOptions::default());

    let first = compiler.compile(&req).unwrap();
    for _ in 0..5 {
        let again = compiler.compile(&req).unwrap();
        assert_eq!(again.sql, first.sql);
        assert_eq!(again.path, first.path);
    }
    validate(&first.sql, Dialect::Postgres);
}
