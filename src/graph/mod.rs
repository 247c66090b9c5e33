//! JoinGraph - tables as nodes, catalog links as annotated edges.
//!
//! Every link record becomes two directed edges, `left -> right` carrying
//! `(left_columns, right_columns)` and `right -> left` carrying the same
//! lists swapped. Tables are interned into an arena in first-seen order, so
//! traversal order (and with it every derived path) depends only on the
//! order of the catalog rows.
//!
//! The module is organized into submodules:
//! - `path`: required-table path resolution (for JOIN ordering)
//! - `condition`: join-condition lookup per resolved edge

mod condition;
mod path;


pub use condition::{join_condition_for, plan_joins, JoinCondition, JoinStep};
pub use path::{resolve_path, JoinEdge, ResolvedJoinPath};

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::catalog::LinkRecord;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Why no join path could be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoPathReason {
    /// A required table has no link in the catalog.
    NotInCatalog { table: String },
    /// Two required tables sit in different connected components.
    Disconnected { from: String, to: String },
}

impl fmt::Display for NoPathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoPathReason::NotInCatalog { table } => {
                write!(f, "table '{}' is not in the link catalog", table)
            }
            NoPathReason::Disconnected { from, to } => {
                write!(f, "no link path connects '{}' and '{}'", from, to)
            }
        }
    }
}

/// Errors raised while building or querying a [`JoinGraph`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A link record cannot become an edge.
    #[error("Invalid link '{left}' -> '{right}': {message}")]
    Construction {
        left: String,
        right: String,
        message: String,
    },

    /// The required tables cannot be connected.
    #[error("Cannot join the selected tables: {reason}")]
    NoPath { reason: NoPathReason },

    /// No directed edge between two tables.
    #[error("No link between '{left}' and '{right}'")]
    MissingEdge { left: String, right: String },
}

/// Stable index of a table inside one [`JoinGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(u32);

impl TableId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into the graph's column-pair storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LinkId(u32);

/// Join columns carried by one directed edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPair {
    /// Columns on the edge's source table.
    pub source_columns: Vec<String>,
    /// Columns on the edge's target table, positionally matched.
    pub target_columns: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct Adjacent {
    neighbor: TableId,
    link: LinkId,
}

/// Directed join graph over catalog tables.
///
/// Built once per resolution request and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct JoinGraph {
    names: Vec<String>,
    index: HashMap<String, TableId>,
    adjacency: Vec<Vec<Adjacent>>,
    links: Vec<ColumnPair>,
}

/// Build a graph from link records. See [`JoinGraph::build`].
pub fn build_graph(links: &[LinkRecord]) -> GraphResult<JoinGraph> {
    JoinGraph::build(links)
}

impl JoinGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from link records, adding a forward and a reverse edge
    /// for each.
    pub fn build(links: &[LinkRecord]) -> GraphResult<Self> {
        let mut graph = Self::new();
        for link in links {
            graph.add_link(link)?;
        }
        debug!(
            tables = graph.table_count(),
            edges = graph.edge_count(),
            "built join graph"
        );
        Ok(graph)
    }

    /// Add both directions of one link record.
    ///
    /// A record for a pair that is already linked replaces the earlier
    /// columns; adjacency order is left as it was.
    pub fn add_link(&mut self, link: &LinkRecord) -> GraphResult<()> {
        Self::check_link(link)?;

        let left = self.intern(&link.left_table);
        let right = self.intern(&link.right_table);

        self.set_edge(
            left,
            right,
            ColumnPair {
                source_columns: link.left_columns.clone(),
                target_columns: link.right_columns.clone(),
            },
        );
        self.set_edge(
            right,
            left,
            ColumnPair {
                source_columns: link.right_columns.clone(),
                target_columns: link.left_columns.clone(),
            },
        );
        Ok(())
    }

    fn check_link(link: &LinkRecord) -> GraphResult<()> {
        let fail = |message: String| GraphError::Construction {
            left: link.left_table.clone(),
            right: link.right_table.clone(),
            message,
        };

        if link.left_table.trim().is_empty() || link.right_table.trim().is_empty() {
            return Err(fail("table name is empty".into()));
        }
        if link.left_table == link.right_table {
            return Err(fail("a table cannot link to itself".into()));
        }
        if link.left_columns.is_empty() || link.right_columns.is_empty() {
            return Err(fail("column list is empty".into()));
        }
        if link.left_columns.len() != link.right_columns.len() {
            return Err(fail(format!(
                "{} left columns but {} right columns",
                link.left_columns.len(),
                link.right_columns.len()
            )));
        }
        Ok(())
    }

    fn intern(&mut self, name: &str) -> TableId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = TableId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        self.adjacency.push(Vec::new());
        id
    }

    fn set_edge(&mut self, from: TableId, to: TableId, columns: ColumnPair) {
        let existing = self.adjacency[from.index()]
            .iter()
            .find(|adj| adj.neighbor == to)
            .map(|adj| adj.link);

        match existing {
            Some(link) => {
                warn!(
                    from = %self.names[from.index()],
                    to = %self.names[to.index()],
                    "duplicate link in catalog, keeping the later columns"
                );
                self.links[link.0 as usize] = columns;
            }
            None => {
                let link = LinkId(self.links.len() as u32);
                self.links.push(columns);
                self.adjacency[from.index()].push(Adjacent { neighbor: to, link });
            }
        }
    }

    /// Look up a table by name.
    pub fn id(&self, name: &str) -> Option<TableId> {
        self.index.get(name).copied()
    }

    /// Name of a table.
    ///
    /// # Panics
    ///
    /// If `id` was not issued by this graph.
    pub fn name(&self, id: TableId) -> &str {
        &self.names[id.index()]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn table_count(&self) -> usize {
        self.names.len()
    }

    /// Number of directed edges (two per distinct linked pair).
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Table names in first-seen order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Neighbors of a table in edge insertion order.
    pub fn neighbors(&self, id: TableId) -> impl Iterator<Item = TableId> + '_ {
        self.adjacency[id.index()].iter().map(|adj| adj.neighbor)
    }

    /// Columns on the directed edge `from -> to`, if it exists.
    pub fn edge_columns(&self, from: TableId, to: TableId) -> Option<&ColumnPair> {
        self.adjacency
            .get(from.index())?
            .iter()
            .find(|adj| adj.neighbor == to)
            .map(|adj| &self.links[adj.link.0 as usize])
    }

    /// Resolve the join path for a set of required tables.
    /// See [`resolve_path`].
    pub fn resolve_path<S: AsRef<str>>(&self, required: &[S]) -> GraphResult<ResolvedJoinPath> {
        resolve_path(self, required)
    }

    /// Join condition for the directed edge `left -> right`.
    /// See [`join_condition_for`].
    pub fn join_condition(&self, left: &str, right: &str) -> GraphResult<JoinCondition> {
        join_condition_for(self, left, right)
    }
}
