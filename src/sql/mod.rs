//! SQL statement model.
//!
//! - [`query`] - SELECT statements with derived tables and join chains
//! - [`expr`] - column, aggregate and predicate expressions
//! - [`token`] - flat token stream rendered in one pass
//! - [`dialect`] - per-database identifier delimiting and parser selection

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

pub use dialect::{Dialect, IdentQuotes, UnknownDialect};
pub use expr::{
    and_all, avg, col, count, count_distinct, max, min, sum, table_col, verbatim, Aggregate, Expr,
    ExprExt,
};
pub use query::{Join, JoinChain, Query, SelectExpr, TableFactor, TableRef};
pub use token::{Keyword, Token, TokenStream};
