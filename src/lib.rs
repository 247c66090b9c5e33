//! # tablelink
//!
//! Join-path resolution over a table link catalog, and SQL assembly for
//! grid-style requests that span several tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Link Catalog (SQLite / JSON)                │
//! │   (left table, right table, left cols, right cols)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [graph builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │          JoinGraph (tables + directed link edges)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [path resolver]
//! ┌─────────────────────────────────────────────────────────┐
//! │     ResolvedJoinPath  →  JoinSteps (join conditions)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [assembler] ◄── request + filter
//! ┌─────────────────────────────────────────────────────────┐
//! │     SQL Query (derived table per source, INNER JOINs)    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod assemble;
pub mod catalog;
pub mod compile;
pub mod config;
pub mod filter;
pub mod graph;
pub mod request;
pub mod sql;

// Re-export SQL submodules at crate level for convenience
pub use sql::dialect;
pub use sql::expr;
pub use sql::query;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{
        CachedLinkProvider, JsonLinkProvider, LinkProvider, LinkRecord, SqliteLinkProvider,
        StaticLinkProvider,
    };
    pub use crate::compile::{compile, CompileError, CompileOptions, CompiledQuery, Compiler};
    pub use crate::dialect::Dialect;
    pub use crate::graph::{JoinEdge, JoinGraph, ResolvedJoinPath};
    pub use crate::request::{AggregateOp, DimensionSpec, MeasureSpec, QueryRequest};
    pub use crate::sql::{Expr, ExprExt, JoinChain, Query, SelectExpr, TableFactor, TableRef};
}

// Also export at crate root for convenience
pub use compile::{compile, CompileError, CompileOptions, CompiledQuery, Compiler};
pub use dialect::Dialect;
pub use graph::{JoinGraph, ResolvedJoinPath};
pub use request::QueryRequest;
