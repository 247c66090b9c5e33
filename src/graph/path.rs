//! Required-table path resolution.
//!
//! Finds a walk that visits every required table, then reduces it to the
//! ordered list of distinct table pairs the query has to join.
//!
//! The walk comes from an open-path travelling-salesman approximation over
//! hop distances: nearest-neighbour construction from every start, the
//! cheapest kept, then 2-opt segment reversal. It is not globally optimal.
//! What is guaranteed:
//!
//! - every required table appears in some edge (or the set has one table and
//!   the path is empty)
//! - no unordered pair appears twice
//! - the same graph and the same required order give the same path

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tracing::debug;

use super::{GraphError, GraphResult, JoinGraph, NoPathReason, TableId};

/// One undirected join between two adjacent tables.
///
/// `left_table` sorts before `right_table`; direction carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JoinEdge {
    pub left_table: String,
    pub right_table: String,
}

impl JoinEdge {
    /// Build an edge with its endpoints in lexicographic order.
    pub fn new(a: &str, b: &str) -> Self {
        let (left, right) = if a <= b { (a, b) } else { (b, a) };
        Self {
            left_table: left.into(),
            right_table: right.into(),
        }
    }

    /// Whether this edge joins `a` and `b`, in either order.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.left_table == a && self.right_table == b)
            || (self.left_table == b && self.right_table == a)
    }

    pub fn touches(&self, table: &str) -> bool {
        self.left_table == table || self.right_table == table
    }
}

impl std::fmt::Display for JoinEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <-> {}", self.left_table, self.right_table)
    }
}

/// Deduplicated, ordered join edges connecting the required tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedJoinPath {
    pub edges: Vec<JoinEdge>,
}

impl ResolvedJoinPath {
    pub fn new(edges: Vec<JoinEdge>) -> Self {
        Self { edges }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JoinEdge> {
        self.edges.iter()
    }

    /// Every table touched by the path, in first-seen order.
    pub fn tables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut tables = Vec::new();
        for edge in &self.edges {
            for table in [edge.left_table.as_str(), edge.right_table.as_str()] {
                if seen.insert(table) {
                    tables.push(table);
                }
            }
        }
        tables
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.edges.iter().any(|e| e.touches(table))
    }

    pub fn contains_pair(&self, a: &str, b: &str) -> bool {
        self.edges.iter().any(|e| e.connects(a, b))
    }
}

impl<'a> IntoIterator for &'a ResolvedJoinPath {
    type Item = &'a JoinEdge;
    type IntoIter = std::slice::Iter<'a, JoinEdge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}

/// BFS result from one source: hop distance and parent pointer per table.
struct Reach {
    dist: Vec<Option<u32>>,
    parent: Vec<Option<TableId>>,
}

impl Reach {
    fn from(graph: &JoinGraph, source: TableId) -> Self {
        let n = graph.table_count();
        let mut dist = vec![None; n];
        let mut parent = vec![None; n];
        let mut queue = VecDeque::new();

        dist[source.index()] = Some(0);
        queue.push_back(source);

        while let Some(current) = queue.pop_front() {
            let next = dist[current.index()].unwrap_or(0) + 1;
            for neighbor in graph.neighbors(current) {
                if dist[neighbor.index()].is_some() {
                    continue;
                }
                dist[neighbor.index()] = Some(next);
                parent[neighbor.index()] = Some(current);
                queue.push_back(neighbor);
            }
        }

        Self { dist, parent }
    }

    /// Tables from the BFS source to `target`, both ends included.
    fn path_to(&self, target: TableId) -> Vec<TableId> {
        let mut path = vec![target];
        let mut current = target;
        while let Some(parent) = self.parent[current.index()] {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}

/// Compute the join path for `required`.
///
/// Duplicate names are ignored after their first occurrence. Zero or one
/// distinct table yields an empty path without consulting the graph, so a
/// single-table query works even for a table with no links.
///
/// # Errors
///
/// - `GraphError::NoPath` with `NotInCatalog` if a table is not in the graph
/// - `GraphError::NoPath` with `Disconnected` if two required tables cannot
///   reach each other
pub fn resolve_path<S: AsRef<str>>(
    graph: &JoinGraph,
    required: &[S],
) -> GraphResult<ResolvedJoinPath> {
    let names = distinct_names(required);
    if names.len() < 2 {
        return Ok(ResolvedJoinPath::default());
    }
    let stops = lookup_ids(graph, &names)?;

    let reach: Vec<Reach> = stops.iter().map(|&s| Reach::from(graph, s)).collect();
    let cost = cost_matrix(graph, &stops, &reach)?;

    let mut tour = nearest_neighbour_tour(&cost);
    two_opt(&mut tour, &cost);

    let walk = expand_walk(&stops, &reach, &tour);
    let path = reduce_walk(graph, &walk);

    debug!(
        required = ?names,
        walk = ?walk.iter().map(|&s| graph.name(s)).collect::<Vec<_>>(),
        edges = path.len(),
        "resolved join path"
    );
    Ok(path)
}

fn distinct_names<S: AsRef<str>>(required: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| seen.insert(*name))
        .collect()
}

fn lookup_ids(graph: &JoinGraph, names: &[&str]) -> GraphResult<Vec<TableId>> {
    names
        .iter()
        .map(|name| {
            graph.id(name).ok_or_else(|| GraphError::NoPath {
                reason: NoPathReason::NotInCatalog {
                    table: name.to_string(),
                },
            })
        })
        .collect()
}

fn cost_matrix(graph: &JoinGraph, stops: &[TableId], reach: &[Reach]) -> GraphResult<Vec<Vec<u32>>> {
    let mut cost = vec![vec![0; stops.len()]; stops.len()];
    for (i, from) in reach.iter().enumerate() {
        for (j, &to) in stops.iter().enumerate() {
            cost[i][j] = from.dist[to.index()].ok_or_else(|| GraphError::NoPath {
                reason: NoPathReason::Disconnected {
                    from: graph.name(stops[i]).to_string(),
                    to: graph.name(to).to_string(),
                },
            })?;
        }
    }
    Ok(cost)
}

fn tour_cost(tour: &[usize], cost: &[Vec<u32>]) -> u64 {
    tour.windows(2).map(|w| cost[w[0]][w[1]] as u64).sum()
}

/// Nearest-neighbour open path tried from every start; the cheapest wins,
/// the earliest start on ties. Ties between candidates go to the table
/// listed first in the required set.
fn nearest_neighbour_tour(cost: &[Vec<u32>]) -> Vec<usize> {
    let n = cost.len();
    let mut best: Option<(u64, Vec<usize>)> = None;

    for start in 0..n {
        let mut visited = vec![false; n];
        let mut tour = Vec::with_capacity(n);
        visited[start] = true;
        tour.push(start);

        let mut current = start;
        while tour.len() < n {
            let next = (0..n)
                .filter(|&j| !visited[j])
                .min_by_key(|&j| (cost[current][j], j));
            let Some(next) = next else { break };
            visited[next] = true;
            tour.push(next);
            current = next;
        }

        let total = tour_cost(&tour, cost);
        if best.as_ref().map_or(true, |(b, _)| total < *b) {
            best = Some((total, tour));
        }
    }

    best.map(|(_, tour)| tour).unwrap_or_default()
}

/// Reverse tour segments while doing so strictly shortens the open path.
fn two_opt(tour: &mut [usize], cost: &[Vec<u32>]) {
    let n = tour.len();
    if n < 3 {
        return;
    }
    let d = |a: usize, b: usize| cost[a][b] as i64;

    let mut improved = true;
    while improved {
        improved = false;
        for i in 0..n - 1 {
            for k in i + 1..n {
                let mut delta = 0i64;
                if i > 0 {
                    delta += d(tour[i - 1], tour[k]) - d(tour[i - 1], tour[i]);
                }
                if k + 1 < n {
                    delta += d(tour[i], tour[k + 1]) - d(tour[k], tour[k + 1]);
                }
                if delta < 0 {
                    tour[i..=k].reverse();
                    improved = true;
                }
            }
        }
    }
}

/// Join consecutive tour stops by their BFS shortest path.
fn expand_walk(stops: &[TableId], reach: &[Reach], tour: &[usize]) -> Vec<TableId> {
    let mut walk = Vec::new();
    if let Some(&first) = tour.first() {
        walk.push(stops[first]);
    }
    for pair in tour.windows(2) {
        let leg = reach[pair[0]].path_to(stops[pair[1]]);
        walk.extend(leg.into_iter().skip(1));
    }
    walk
}

/// Consecutive walk pairs, direction erased, first occurrence kept.
fn reduce_walk(graph: &JoinGraph, walk: &[TableId]) -> ResolvedJoinPath {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for pair in walk.windows(2) {
        let edge = JoinEdge::new(graph.name(pair[0]), graph.name(pair[1]));
        if seen.insert(edge.clone()) {
            edges.push(edge);
        }
    }
    ResolvedJoinPath::new(edges)
}
