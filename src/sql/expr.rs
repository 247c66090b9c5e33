//! Expression model.
//!
//! Assembled statements only need a handful of expression shapes: column
//! references, aggregate calls over a column, equality predicates and their
//! conjunction (join conditions), plus the caller's filter text copied
//! verbatim.

use super::dialect::Dialect;
use super::query::SelectExpr;
use super::token::{Keyword, Token, TokenStream};

/// Aggregate functions a measure can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Count => "COUNT",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `table.column`, or a bare `column`.
    Column {
        table: Option<String>,
        column: String,
    },

    /// `left = right`
    Eq(Box<Expr>, Box<Expr>),

    /// `a AND b AND ...`, kept flat.
    And(Vec<Expr>),

    /// `FUNC([DISTINCT] arg)`
    Aggregate {
        func: Aggregate,
        distinct: bool,
        arg: Box<Expr>,
    },

    /// Already-validated SQL text, emitted unchanged.
    Verbatim(String),
}

impl Expr {
    /// Whether this expression aggregates rows.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::Aggregate { .. } => true,
            Expr::Eq(l, r) => l.is_aggregate() || r.is_aggregate(),
            Expr::And(parts) => parts.iter().any(Expr::is_aggregate),
            Expr::Column { .. } | Expr::Verbatim(_) => false,
        }
    }

    /// Append this expression's tokens to `ts`.
    pub fn write_tokens(&self, ts: &mut TokenStream) {
        match self {
            Expr::Column { table, column } => {
                if let Some(table) = table {
                    ts.ident(table).punct('.');
                }
                ts.ident(column);
            }
            Expr::Eq(left, right) => {
                left.write_tokens(ts);
                ts.space().punct('=').space();
                right.write_tokens(ts);
            }
            Expr::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        ts.padded(Keyword::And);
                    }
                    part.write_tokens(ts);
                }
            }
            Expr::Aggregate {
                func,
                distinct,
                arg,
            } => {
                ts.push(Token::Call(func.name())).punct('(');
                if *distinct {
                    ts.keyword(Keyword::Distinct).space();
                }
                arg.write_tokens(ts);
                ts.punct(')');
            }
            Expr::Verbatim(text) => {
                ts.push(Token::Verbatim(text.clone()));
            }
        }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        self.write_tokens(&mut ts);
        ts
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens().render(dialect)
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Unqualified column reference.
pub fn col(column: &str) -> Expr {
    Expr::Column {
        table: None,
        column: column.into(),
    }
}

/// Qualified column reference (`table.column`).
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

/// SQL text copied to the output as-is.
pub fn verbatim(text: &str) -> Expr {
    Expr::Verbatim(text.into())
}

/// Conjunction of `exprs`; `None` when there are none.
pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    exprs.into_iter().reduce(<Expr as ExprExt>::and)
}

fn aggregate(func: Aggregate, arg: Expr, distinct: bool) -> Expr {
    Expr::Aggregate {
        func,
        distinct,
        arg: Box::new(arg),
    }
}

pub fn sum(arg: Expr) -> Expr {
    aggregate(Aggregate::Sum, arg, false)
}

pub fn count(arg: Expr) -> Expr {
    aggregate(Aggregate::Count, arg, false)
}

pub fn count_distinct(arg: Expr) -> Expr {
    aggregate(Aggregate::Count, arg, true)
}

pub fn avg(arg: Expr) -> Expr {
    aggregate(Aggregate::Avg, arg, false)
}

pub fn min(arg: Expr) -> Expr {
    aggregate(Aggregate::Min, arg, false)
}

pub fn max(arg: Expr) -> Expr {
    aggregate(Aggregate::Max, arg, false)
}

// =============================================================================
// Fluent builders
// =============================================================================

/// Extension trait for building expressions fluently.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn eq(self, other: Expr) -> Expr {
        Expr::Eq(Box::new(self.into_expr()), Box::new(other))
    }

    /// AND two expressions, flattening nested conjunctions.
    fn and(self, other: Expr) -> Expr {
        let mut parts = match self.into_expr() {
            Expr::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Expr::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Expr::And(parts)
    }

    /// `expr AS name` for a SELECT list.
    fn alias(self, name: &str) -> SelectExpr {
        SelectExpr::new(self.into_expr()).with_alias(name)
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}
