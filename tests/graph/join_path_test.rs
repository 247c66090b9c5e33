//! Join graph and path resolution properties over realistic catalogs.

use std::collections::HashSet;

use tablelink::assemble::{assemble, AssemblyError};
use tablelink::catalog::LinkRecord;
use tablelink::graph::{
    join_condition_for, plan_joins, JoinCondition, JoinEdge, JoinGraph, JoinStep,
    ResolvedJoinPath,
};
use tablelink::request::{build_projections, QueryRequest};

/// A snowflake around two facts sharing conformed dimensions.
fn warehouse_links() -> Vec<LinkRecord> {
    vec![
        LinkRecord::new("enrollment_fact", "term_dim", &["term_id"], &["term_id"]),
        LinkRecord::new("enrollment_fact", "student_dim", &["student_id"], &["student_id"]),
        LinkRecord::new("enrollment_fact", "course_dim", &["course_id", "term_id"], &["course_id", "term_id"]),
        LinkRecord::new("course_dim", "dept_dim", &["dept_id"], &["dept_id"]),
        LinkRecord::new("dept_dim", "college_dim", &["college_id"], &["college_id"]),
        LinkRecord::new("award_fact", "student_dim", &["student_id"], &["student_id"]),
        LinkRecord::new("award_fact", "term_dim", &["award_term_id"], &["term_id"]),
        LinkRecord::new("award_fact", "program_dim", &["program_id"], &["program_id"]),
        LinkRecord::new("program_dim", "college_dim", &["college_id"], &["college_id"]),
    ]
}

fn assert_well_formed(path: &ResolvedJoinPath, required: &[&str]) {
    let tables: HashSet<_> = path.tables().into_iter().collect();
    for table in required {
        assert!(tables.contains(table), "{} missing from {:?}", table, path);
    }

    let mut pairs = HashSet::new();
    for edge in path {
        assert!(pairs.insert((edge.left_table.clone(), edge.right_table.clone())), "duplicate {}", edge);
    }
}

#[test]
fn test_every_link_is_symmetric() {
    let links = warehouse_links();
    let graph = JoinGraph::build(&links).unwrap();
    assert_eq!(graph.edge_count(), links.len() * 2);

    for link in &links {
        let forward = join_condition_for(&graph, &link.left_table, &link.right_table).unwrap();
        let backward = join_condition_for(&graph, &link.right_table, &link.left_table).unwrap();

        assert_eq!(forward.left_columns, link.left_columns);
        assert_eq!(forward.right_columns, link.right_columns);
        assert_eq!(backward.left_columns, forward.right_columns);
        assert_eq!(backward.right_columns, forward.left_columns);
        assert_eq!(backward, forward.reversed());
    }
}

#[test]
fn test_paths_cover_required_tables() {
    let graph = JoinGraph::build(&warehouse_links()).unwrap();

    let cases: &[&[&str]] = &[
        &["term_dim", "student_dim"],
        &["college_dim", "term_dim"],
        &["enrollment_fact", "award_fact", "college_dim"],
        &["dept_dim", "program_dim", "student_dim", "term_dim"],
        &["course_dim", "award_fact"],
    ];

    for required in cases {
        let path = graph.resolve_path(required).unwrap();
        assert!(!path.is_empty());
        assert_well_formed(&path, required);

        // Each step joins onto something already joined.
        let steps = plan_joins(&graph, &path).unwrap();
        let mut joined: HashSet<&str> = HashSet::new();
        for (i, step) in steps.iter().enumerate() {
            let l = step.condition.left_table.as_str();
            let r = step.condition.right_table.as_str();
            assert!(i == 0 || joined.contains(l) || joined.contains(r), "step {} detached", i);
            joined.insert(l);
            joined.insert(r);
        }
    }
}

#[test]
fn test_resolution_is_repeatable() {
    let required = ["program_dim", "course_dim", "term_dim", "student_dim"];
    let first = JoinGraph::build(&warehouse_links())
        .unwrap()
        .resolve_path(&required)
        .unwrap();

    for _ in 0..10 {
        let again = JoinGraph::build(&warehouse_links())
            .unwrap()
            .resolve_path(&required)
            .unwrap();
        assert_eq!(again, first);
    }
}

#[test]
fn test_column_count_mismatch_rejected_by_assembler() {
    let request = QueryRequest::from_json(
        r#"{"dimensionData": [
            {"table": "enrollment_fact", "columns": "units"},
            {"table": "course_dim", "columns": "title"}
        ]}"#,
    )
    .unwrap();
    let projections = build_projections(&request, None).unwrap();

    let step = JoinStep {
        edge: JoinEdge::new("enrollment_fact", "course_dim"),
        condition: JoinCondition {
            left_table: "enrollment_fact".into(),
            right_table: "course_dim".into(),
            left_columns: vec!["course_id".into(), "term_id".into()],
            right_columns: vec!["course_id".into()],
        },
    };

    let err = assemble(&projections, &[step], None, None, tablelink::Dialect::Postgres).unwrap_err();
    assert_eq!(
        err,
        AssemblyError::ColumnCountMismatch {
            left: "enrollment_fact".into(),
            right: "course_dim".into(),
            left_count: 2,
            right_count: 1,
        }
    );
}

#[test]
fn test_composite_keys_become_anded_predicates() {
    let graph = JoinGraph::build(&warehouse_links()).unwrap();
    let path = graph.resolve_path(&["course_dim", "enrollment_fact"]).unwrap();
    let steps = plan_joins(&graph, &path).unwrap();

    let request = QueryRequest::from_json(
        r#"{"dimensionData": [
            {"table": "course_dim", "columns": "title", "aliasName": "Course"},
            {"table": "enrollment_fact", "columns": "units", "aliasName": "Units"}
        ]}"#,
    )
    .unwrap();
    let projections = build_projections(&request, None).unwrap();
    let sql = assemble(&projections, &steps, None, None, tablelink::Dialect::Postgres)
        .unwrap()
        .to_sql(tablelink::Dialect::Postgres);

    assert!(sql.contains(
        "ON \"course_dim\".\"course_id\" = \"enrollment_fact\".\"course_id\" AND \"course_dim\".\"term_id\" = \"enrollment_fact\".\"term_id\""
    ));
}
