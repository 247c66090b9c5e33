//! Join-condition lookup.

use super::{GraphError, GraphResult, JoinEdge, JoinGraph, ResolvedJoinPath};

/// Equality predicates for joining `left_table` to `right_table`:
/// `left_table.left_columns[i] = right_table.right_columns[i]` for each `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub left_table: String,
    pub right_table: String,
    pub left_columns: Vec<String>,
    pub right_columns: Vec<String>,
}

impl JoinCondition {
    /// Column pairs in positional order.
    pub fn predicates(&self) -> impl Iterator<Item = (&str, &str)> {
        self.left_columns
            .iter()
            .zip(&self.right_columns)
            .map(|(l, r)| (l.as_str(), r.as_str()))
    }

    /// The same condition seen from the other table.
    pub fn reversed(&self) -> Self {
        Self {
            left_table: self.right_table.clone(),
            right_table: self.left_table.clone(),
            left_columns: self.right_columns.clone(),
            right_columns: self.left_columns.clone(),
        }
    }

    /// Join-key columns this condition needs from `table`.
    pub fn columns_for(&self, table: &str) -> &[String] {
        if table == self.left_table {
            &self.left_columns
        } else if table == self.right_table {
            &self.right_columns
        } else {
            &[]
        }
    }
}

/// One resolved edge with the condition used to join it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub edge: JoinEdge,
    pub condition: JoinCondition,
}

/// Look up the columns on the directed edge `left -> right`.
///
/// Fails with `GraphError::MissingEdge` when either table is unknown or the
/// two are not directly linked.
pub fn join_condition_for(graph: &JoinGraph, left: &str, right: &str) -> GraphResult<JoinCondition> {
    let missing = || GraphError::MissingEdge {
        left: left.to_string(),
        right: right.to_string(),
    };

    let from = graph.id(left).ok_or_else(missing)?;
    let to = graph.id(right).ok_or_else(missing)?;
    let columns = graph.edge_columns(from, to).ok_or_else(missing)?;

    Ok(JoinCondition {
        left_table: left.to_string(),
        right_table: right.to_string(),
        left_columns: columns.source_columns.clone(),
        right_columns: columns.target_columns.clone(),
    })
}

/// Pair every edge of `path` with its join condition, oriented the way the
/// edge is written.
pub fn plan_joins(graph: &JoinGraph, path: &ResolvedJoinPath) -> GraphResult<Vec<JoinStep>> {
    path.iter()
        .map(|edge| {
            let condition = join_condition_for(graph, &edge.left_table, &edge.right_table)?;
            Ok(JoinStep {
                edge: edge.clone(),
                condition,
            })
        })
        .collect()
}
