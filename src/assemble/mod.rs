//! Query assembler.
//!
//! Turns per-table projections and an ordered list of join steps into one
//! nested statement:
//!
//! ```text
//! SELECT "t1"."alias", "t2"."alias", ...
//! FROM (
//!   (SELECT ... FROM t1) AS "t1"
//!   INNER JOIN (SELECT ... FROM t2) AS "t2" ON "t1"."k" = "t2"."k"
//!   INNER JOIN ...
//! )
//! WHERE <filter text>
//! ```
//!
//! Each derived table is aliased with its own table name, so the outer
//! projection and the verbatim filter (`table.column`) resolve against it.
//! Inner SELECTs expose dimensions, aggregated measures, the join keys their
//! neighbours need and the columns the filter reads.
//!
//! All intermediate state lives in an [`AssemblyContext`] created per call.

use std::collections::HashSet;

use tracing::{debug, error};

use crate::filter::FilterExpr;
use crate::graph::{JoinCondition, JoinStep};
use crate::request::{OutputColumn, ProjectionSet, TableProjection};
use crate::sql::{
    and_all, table_col, verbatim, Dialect, Expr, ExprExt, JoinChain, Query, SelectExpr,
    TableFactor, TableRef,
};

/// Result type for assembly.
pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// Inconsistencies between projections and the join path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("Nothing to assemble: the request names no tables")]
    EmptyProjection,

    #[error("The request selects no columns: add a dimension or a measure")]
    NoOutputColumns,

    #[error("Table '{table}' is not part of the join path")]
    TableNotInPath { table: String },

    #[error("Join '{left}' -> '{right}' has {left_count} left columns but {right_count} right columns")]
    ColumnCountMismatch {
        left: String,
        right: String,
        left_count: usize,
        right_count: usize,
    },

    #[error("Join '{left}' -> '{right}' has no columns")]
    EmptyJoinCondition { left: String, right: String },

    #[error("Join '{left}' -> '{right}' does not touch any table joined so far")]
    DisconnectedEdge { left: String, right: String },

    #[error("Alias '{alias}' in table '{table}' is used for two different expressions")]
    AliasConflict { table: String, alias: String },
}

/// The assembled statement and the columns it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledQuery {
    pub query: Query,
    /// Outer columns in SELECT order.
    pub columns: Vec<OutputColumn>,
    /// Tables in the FROM clause, in join order.
    pub tables: Vec<String>,
}

impl AssembledQuery {
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.query.to_sql(dialect)
    }
}

/// Inner SELECT under construction for one table.
#[derive(Debug)]
struct InnerSelect {
    table: String,
    dialect: Dialect,
    items: Vec<SelectExpr>,
    group_by: Vec<Expr>,
    has_measures: bool,
}

impl InnerSelect {
    fn new(table: &str, dialect: Dialect) -> Self {
        Self {
            table: table.to_string(),
            dialect,
            items: Vec::new(),
            group_by: Vec::new(),
            has_measures: false,
        }
    }

    /// Whether `a` and `b` read the same value on this dialect.
    fn same_expr(&self, a: &Expr, b: &Expr) -> bool {
        match (a, b) {
            (
                Expr::Column { table: ta, column: ca },
                Expr::Column { table: tb, column: cb },
            ) => ta == tb && self.dialect.same_column(ca, cb),
            _ => a == b,
        }
    }

    /// Add `expr AS alias`, skipping an equivalent item already present.
    /// Aliases compare the way the dialect compares column names.
    fn add(&mut self, expr: Expr, alias: &str) -> AssemblyResult<()> {
        let dialect = self.dialect;
        if let Some(existing) = self.items.iter().find(|item| {
            item.alias
                .as_deref()
                .is_some_and(|a| dialect.same_column(a, alias))
        }) {
            if self.same_expr(&existing.expr, &expr) {
                return Ok(());
            }
            return Err(AssemblyError::AliasConflict {
                table: self.table.clone(),
                alias: alias.to_string(),
            });
        }

        if expr.is_aggregate() {
            self.has_measures = true;
        } else {
            self.group_by.push(expr.clone());
        }
        self.items.push(expr.alias(alias));
        Ok(())
    }

    fn add_column(&mut self, column: &str, alias: &str) -> AssemblyResult<()> {
        let expr = table_col(&self.table, column);
        self.add(expr, alias)
    }

    fn into_query(self, schema: Option<&str>) -> Query {
        let mut from = TableRef::new(&self.table);
        if let Some(schema) = schema {
            from = from.with_schema(schema);
        }
        let group_by = if self.has_measures {
            self.group_by
        } else {
            Vec::new()
        };
        Query::new()
            .select(self.items)
            .from(from)
            .group_by(group_by)
    }
}

/// Request-scoped assembly state.
#[derive(Debug)]
pub struct AssemblyContext<'a> {
    schema: Option<&'a str>,
    dialect: Dialect,
    inner: Vec<InnerSelect>,
    joined: HashSet<String>,
    chain: Option<JoinChain>,
}

impl<'a> AssemblyContext<'a> {
    pub fn new(schema: Option<&'a str>, dialect: Dialect) -> Self {
        Self {
            schema,
            dialect,
            inner: Vec::new(),
            joined: HashSet::new(),
            chain: None,
        }
    }

    fn inner_mut(&mut self, table: &str) -> &mut InnerSelect {
        let idx = match self.inner.iter().position(|s| s.table == table) {
            Some(idx) => idx,
            None => {
                self.inner.push(InnerSelect::new(table, self.dialect));
                self.inner.len() - 1
            }
        };
        &mut self.inner[idx]
    }

    /// Take the finished inner SELECT for `table` as a derived table.
    fn derived(&mut self, table: &str) -> TableFactor {
        let schema = self.schema;
        let inner = match self.inner.iter().position(|s| s.table == table) {
            Some(idx) => self.inner.swap_remove(idx),
            None => InnerSelect::new(table, self.dialect),
        };
        TableFactor::derived(inner.into_query(schema), table)
    }

    /// Fill in every inner SELECT item for `table`.
    fn project(
        &mut self,
        table: &str,
        projection: Option<&TableProjection>,
        steps: &[JoinStep],
    ) -> AssemblyResult<()> {
        let inner = self.inner_mut(table);

        if let Some(projection) = projection {
            for dim in &projection.dimensions {
                inner.add_column(&dim.column, &dim.alias)?;
            }
            for measure in &projection.measures {
                let expr = measure.op.apply(table_col(table, &measure.column));
                inner.add(expr, &measure.alias)?;
            }
        }

        for step in steps {
            for column in step.condition.columns_for(table) {
                inner.add_column(column, column)?;
            }
        }

        if let Some(projection) = projection {
            for column in &projection.filter_columns {
                inner.add_column(column, column)?;
            }
        }
        Ok(())
    }

    /// Extend the chain with one join step, skipping it when both tables
    /// are already joined.
    fn join(&mut self, condition: &JoinCondition) -> AssemblyResult<()> {
        let left = condition.left_table.as_str();
        let right = condition.right_table.as_str();
        let on = on_clause(condition)?;

        let Some(chain) = self.chain.take() else {
            let base = self.derived(left);
            let other = self.derived(right);
            self.chain = Some(JoinChain::new(base).inner_join(other, on));
            self.joined.insert(left.to_string());
            self.joined.insert(right.to_string());
            return Ok(());
        };

        let new_table = match (self.joined.contains(left), self.joined.contains(right)) {
            (true, true) => {
                debug!(left, right, "both tables already joined, skipping edge");
                self.chain = Some(chain);
                return Ok(());
            }
            (true, false) => right,
            (false, true) => left,
            (false, false) => {
                self.chain = Some(chain);
                return Err(AssemblyError::DisconnectedEdge {
                    left: left.to_string(),
                    right: right.to_string(),
                });
            }
        };

        let factor = self.derived(new_table);
        self.chain = Some(chain.inner_join(factor, on));
        self.joined.insert(new_table.to_string());
        Ok(())
    }
}

fn check_condition(condition: &JoinCondition) -> AssemblyResult<()> {
    let (left_count, right_count) = (condition.left_columns.len(), condition.right_columns.len());
    if left_count != right_count {
        return Err(AssemblyError::ColumnCountMismatch {
            left: condition.left_table.clone(),
            right: condition.right_table.clone(),
            left_count,
            right_count,
        });
    }
    if left_count == 0 {
        return Err(AssemblyError::EmptyJoinCondition {
            left: condition.left_table.clone(),
            right: condition.right_table.clone(),
        });
    }
    Ok(())
}

fn on_clause(condition: &JoinCondition) -> AssemblyResult<Expr> {
    and_all(condition.predicates().map(|(l, r)| {
        table_col(&condition.left_table, l).eq(table_col(&condition.right_table, r))
    }))
    .ok_or_else(|| AssemblyError::EmptyJoinCondition {
        left: condition.left_table.clone(),
        right: condition.right_table.clone(),
    })
}

/// Tables in the FROM clause, in the order they enter the chain.
fn participating_tables(
    projections: &ProjectionSet,
    steps: &[JoinStep],
) -> AssemblyResult<Vec<String>> {
    let first = projections
        .tables
        .first()
        .ok_or(AssemblyError::EmptyProjection)?;

    if steps.is_empty() {
        if let Some(extra) = projections.tables.get(1) {
            return Err(AssemblyError::TableNotInPath {
                table: extra.table.clone(),
            });
        }
        return Ok(vec![first.table.clone()]);
    }

    let mut seen = HashSet::new();
    let mut tables = Vec::new();
    for step in steps {
        for table in [&step.condition.left_table, &step.condition.right_table] {
            if seen.insert(table.as_str()) {
                tables.push(table.clone());
            }
        }
    }

    if let Some(missing) = projections
        .tables
        .iter()
        .find(|p| !seen.contains(p.table.as_str()))
    {
        return Err(AssemblyError::TableNotInPath {
            table: missing.table.clone(),
        });
    }
    Ok(tables)
}

/// Assemble the nested statement.
///
/// `steps` come from [`plan_joins`](crate::graph::plan_joins) in path order;
/// with no steps the request must name exactly one table. `filter` is
/// appended verbatim as the outer WHERE; `schema` prefixes every inner FROM.
/// `dialect` decides whether two inner aliases that differ only in case
/// collide.
pub fn assemble(
    projections: &ProjectionSet,
    steps: &[JoinStep],
    filter: Option<&FilterExpr>,
    schema: Option<&str>,
    dialect: Dialect,
) -> AssemblyResult<AssembledQuery> {
    assemble_inner(projections, steps, filter, schema, dialect).map_err(|err| {
        error!(error = %err, "query assembly failed");
        err
    })
}

fn assemble_inner(
    projections: &ProjectionSet,
    steps: &[JoinStep],
    filter: Option<&FilterExpr>,
    schema: Option<&str>,
    dialect: Dialect,
) -> AssemblyResult<AssembledQuery> {
    if projections.outputs.is_empty() {
        return Err(if projections.tables.is_empty() {
            AssemblyError::EmptyProjection
        } else {
            AssemblyError::NoOutputColumns
        });
    }
    for step in steps {
        check_condition(&step.condition)?;
    }
    let tables = participating_tables(projections, steps)?;

    let mut ctx = AssemblyContext::new(schema, dialect);
    for table in &tables {
        ctx.project(table, projections.get(table), steps)?;
    }

    let from = if steps.is_empty() {
        ctx.derived(&tables[0])
    } else {
        for step in steps {
            ctx.join(&step.condition)?;
        }
        match ctx.chain.take() {
            Some(chain) => TableFactor::from(chain),
            None => return Err(AssemblyError::EmptyProjection),
        }
    };

    let select: Vec<SelectExpr> = projections
        .outputs
        .iter()
        .map(|c| SelectExpr::new(table_col(&c.table, &c.alias)))
        .collect();

    let mut query = Query::new().select(select).from(from);
    if let Some(filter) = filter {
        query = query.filter(verbatim(&filter.text));
    }

    debug!(tables = ?tables, columns = projections.outputs.len(), "assembled query");

    Ok(AssembledQuery {
        query,
        columns: projections.outputs.clone(),
        tables,
    })
}
