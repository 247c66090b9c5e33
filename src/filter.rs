//! Filter expressions.
//!
//! The caller's filter is one SQL boolean expression over `table.column`
//! references, e.g.
//!
//! ```text
//! (enrollment_term_dim.term_year = 2020 and student_dim.gender in ('F', 'X'))
//! ```
//!
//! It is parsed with `sqlparser` for the target dialect so that every column
//! it mentions can be attributed to its table. The text itself is emitted
//! unchanged in the outer WHERE clause; parsing only decides which tables
//! must be joined and which columns each inner SELECT has to expose.
//!
//! In the outer query every table is a derived table aliased by its bare
//! name, so references must be exactly `table.column`. Unquoted parts are
//! recorded under the name the database resolves them to (lower case on
//! Postgres), which keeps the inner projection and the verbatim WHERE text
//! pointing at the same column.

use std::collections::HashSet;
use std::ops::ControlFlow;

use sqlparser::ast::{visit_expressions, Expr as AstExpr, Ident};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token as SqlToken;

use crate::sql::Dialect;

/// Errors raised while parsing a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Filter is not a valid SQL expression: {0}")]
    Syntax(String),

    #[error("Filter column '{column}' must be qualified with its table (table.column)")]
    UnqualifiedColumn { column: String },

    #[error("Filter column '{reference}' must be written as table.column, without a schema")]
    OverQualifiedColumn { reference: String },
}

/// A column referenced by a filter, with each name as the database
/// resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterColumn {
    pub table: String,
    pub column: String,
}

/// Name an identifier resolves to: delimited names are kept as written.
fn resolve_ident(ident: &Ident, dialect: Dialect) -> String {
    match ident.quote_style {
        Some(_) => ident.value.clone(),
        None => dialect.fold_unquoted(&ident.value),
    }
}

/// A parsed, attributed filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    /// Trimmed original text, emitted verbatim.
    pub text: String,
    /// Referenced columns in first-seen order, without duplicates.
    pub columns: Vec<FilterColumn>,
}

impl FilterExpr {
    /// Tables referenced by the filter, in first-seen order.
    pub fn tables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .map(|c| c.table.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Columns the filter reads from `table`.
    pub fn columns_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.columns
            .iter()
            .filter(move |c| c.table == table)
            .map(|c| c.column.as_str())
    }
}

/// Parse a filter. Empty or whitespace-only input means "no filter".
pub fn parse_filter(text: &str, dialect: Dialect) -> Result<Option<FilterExpr>, FilterError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let parser_dialect = dialect.parser_dialect();
    let mut parser = Parser::new(&*parser_dialect)
        .try_with_sql(text)
        .map_err(|e| FilterError::Syntax(e.to_string()))?;
    let expr = parser
        .parse_expr()
        .map_err(|e| FilterError::Syntax(e.to_string()))?;

    let next = parser.peek_token();
    if next.token != SqlToken::EOF {
        return Err(FilterError::Syntax(format!(
            "unexpected '{}' after the expression",
            next.token
        )));
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    let flow = visit_expressions(&expr, |e| {
        match e {
            AstExpr::Identifier(ident) => {
                return ControlFlow::Break(FilterError::UnqualifiedColumn {
                    column: ident.value.clone(),
                });
            }
            AstExpr::CompoundIdentifier(parts) => match parts.as_slice() {
                [column] => {
                    return ControlFlow::Break(FilterError::UnqualifiedColumn {
                        column: column.value.clone(),
                    });
                }
                [table, column] => {
                    let column = FilterColumn {
                        table: resolve_ident(table, dialect),
                        column: resolve_ident(column, dialect),
                    };
                    if seen.insert(column.clone()) {
                        columns.push(column);
                    }
                }
                _ => {
                    let reference = parts
                        .iter()
                        .map(|p| p.value.as_str())
                        .collect::<Vec<_>>()
                        .join(".");
                    return ControlFlow::Break(FilterError::OverQualifiedColumn { reference });
                }
            },
            _ => {}
        }
        ControlFlow::Continue(())
    });

    if let ControlFlow::Break(err) = flow {
        return Err(err);
    }

    Ok(Some(FilterExpr {
        text: text.to_string(),
        columns,
    }))
}
