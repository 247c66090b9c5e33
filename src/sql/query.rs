//! SELECT statements.
//!
//! Besides plain tables, a FROM clause can hold derived tables
//! (`(SELECT ...) AS name`) and parenthesized join chains, which is the
//! shape every assembled statement takes:
//!
//! ```text
//! SELECT ... FROM ((SELECT ...) AS a INNER JOIN (SELECT ...) AS b ON ...) WHERE ...
//! ```
//!
//! Rendering is indentation-aware: each nesting level indents its clauses
//! by one more step, so a statement reads top-down like the join it builds.

use super::dialect::Dialect;
use super::expr::{Expr, ExprExt};
use super::token::{Keyword, TokenStream};

// =============================================================================
// SELECT items
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn write(&self, ts: &mut TokenStream) {
        self.expr.write_tokens(ts);
        if let Some(alias) = &self.alias {
            ts.alias(alias);
        }
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

// =============================================================================
// FROM items
// =============================================================================

/// A physical table, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.into(),
        }
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.into());
        self
    }

    fn write(&self, ts: &mut TokenStream) {
        if let Some(schema) = &self.schema {
            ts.ident(schema).punct('.');
        }
        ts.ident(&self.table);
    }
}

/// Something that can appear after FROM or INNER JOIN.
#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    Table(TableRef),
    /// `(SELECT ...) AS alias`
    Derived { query: Box<Query>, alias: String },
    /// `(a INNER JOIN b ON ... INNER JOIN c ON ...)`
    NestedJoin(Box<JoinChain>),
}

impl TableFactor {
    pub fn derived(query: Query, alias: &str) -> Self {
        TableFactor::Derived {
            query: Box::new(query),
            alias: alias.into(),
        }
    }

    fn write(&self, ts: &mut TokenStream, depth: usize) {
        match self {
            TableFactor::Table(table) => table.write(ts),
            TableFactor::Derived { query, alias } => {
                ts.punct('(').line(depth + 1);
                query.write(ts, depth + 1);
                ts.line(depth).punct(')').alias(alias);
            }
            TableFactor::NestedJoin(chain) => {
                ts.punct('(').line(depth + 1);
                chain.write(ts, depth + 1);
                ts.line(depth).punct(')');
            }
        }
    }
}

impl From<TableRef> for TableFactor {
    fn from(table: TableRef) -> Self {
        TableFactor::Table(table)
    }
}

impl From<JoinChain> for TableFactor {
    fn from(chain: JoinChain) -> Self {
        TableFactor::NestedJoin(Box::new(chain))
    }
}

// =============================================================================
// Joins
// =============================================================================

/// An INNER JOIN clause. Assembled statements never use any other join type.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: TableFactor,
    pub on: Expr,
}

/// A left-deep chain of inner joins: `base JOIN t1 ON ... JOIN t2 ON ...`.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct JoinChain {
    pub base: TableFactor,
    pub joins: Vec<Join>,
}

impl JoinChain {
    pub fn new(base: impl Into<TableFactor>) -> Self {
        Self {
            base: base.into(),
            joins: Vec::new(),
        }
    }

    pub fn inner_join(mut self, table: impl Into<TableFactor>, on: Expr) -> Self {
        self.joins.push(Join {
            table: table.into(),
            on,
        });
        self
    }

    fn write(&self, ts: &mut TokenStream, depth: usize) {
        self.base.write(ts, depth);
        for join in &self.joins {
            ts.line(depth).keyword(Keyword::InnerJoin).space();
            join.table.write(ts, depth);
            ts.padded(Keyword::On);
            join.on.write_tokens(ts);
        }
    }
}

// =============================================================================
// Query
// =============================================================================

/// A SELECT statement.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until rendered with to_sql()"]
pub struct Query {
    pub select: Vec<SelectExpr>,
    pub from: Option<TableFactor>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SELECT list.
    pub fn select(mut self, items: Vec<impl Into<SelectExpr>>) -> Self {
        self.select = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn from(mut self, factor: impl Into<TableFactor>) -> Self {
        self.from = Some(factor.into());
        self
    }

    /// Add a WHERE condition, ANDed with any existing one.
    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by = exprs;
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        self.write(&mut ts, 0);
        ts
    }

    /// Render the statement for `dialect`.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens().render(dialect)
    }

    /// Emit the query with every line after the first indented `depth` levels.
    fn write(&self, ts: &mut TokenStream, depth: usize) {
        ts.keyword(Keyword::Select);

        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                ts.punct(',');
            }
            ts.line(depth + 1);
            item.write(ts);
        }

        if let Some(from) = &self.from {
            ts.line(depth).keyword(Keyword::From).space();
            from.write(ts, depth);
        }

        if let Some(condition) = &self.where_clause {
            ts.line(depth).keyword(Keyword::Where).space();
            condition.write_tokens(ts);
        }

        for (i, expr) in self.group_by.iter().enumerate() {
            if i == 0 {
                ts.line(depth).keyword(Keyword::GroupBy).space();
            } else {
                ts.punct(',').space();
            }
            expr.write_tokens(ts);
        }
    }
}

impl std::fmt::Display for Query {
    /// Formats the query for the default dialect (Postgres).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql(Dialect::default()))
    }
}
