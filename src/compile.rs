//! End-to-end compilation from a query request to SQL.
//!
//! ```text
//! Link catalog → JoinGraph → ResolvedJoinPath → JoinSteps ┐
//! Request → Filter → ProjectionSet ───────────────────────┴→ Assemble → SQL
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tablelink::catalog::{LinkRecord, StaticLinkProvider};
//! use tablelink::compile::{CompileOptions, Compiler};
//! use tablelink::request::QueryRequest;
//! use tablelink::sql::Dialect;
//!
//! let provider = StaticLinkProvider::new(vec![LinkRecord::new(
//!     "enrollment_fact", "enrollment_term_dim", &["term_id"], &["term_id"],
//! )]);
//! let compiler = Compiler::new(provider, CompileOptions::default().with_dialect(Dialect::Postgres));
//! let request = QueryRequest::from_json(payload)?;
//! let compiled = compiler.compile(&request)?;
//! println!("{}", compiled.sql);
//! ```

use serde::Serialize;
use tracing::info;

use crate::assemble::{assemble, AssemblyError};
use crate::catalog::{CatalogError, LinkProvider, LinkRecord};
use crate::filter::{parse_filter, FilterError};
use crate::graph::{plan_joins, GraphError, JoinGraph, ResolvedJoinPath};
use crate::request::{build_projections, OutputColumn, QueryRequest, RequestError};
use crate::sql::Dialect;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    Graph(#[from] GraphError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
}

/// Who has to act on a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Broken catalog or settings; an operator must fix the data.
    Configuration,
    /// The selected tables cannot be joined with the current catalog.
    Connectivity,
    /// The request itself is malformed.
    Client,
}

impl CompileError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CompileError::Catalog(_) => ErrorClass::Configuration,
            CompileError::Graph(GraphError::Construction { .. }) => ErrorClass::Configuration,
            CompileError::Graph(GraphError::NoPath { .. } | GraphError::MissingEdge { .. }) => {
                ErrorClass::Connectivity
            }
            CompileError::Assembly(_) | CompileError::Filter(_) | CompileError::InvalidRequest(_) => {
                ErrorClass::Client
            }
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,
    /// Schema for inner FROMs when the request does not name one.
    pub schema: Option<String>,
}

impl CompileOptions {
    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the fallback schema.
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result of compiling a request.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQuery {
    /// The generated SQL string.
    pub sql: String,

    /// Result columns in SELECT order, for mapping rows back to fields.
    pub columns: Vec<OutputColumn>,

    /// The join path the statement follows.
    pub path: ResolvedJoinPath,

    /// The dialect used for generation.
    pub dialect: Dialect,
}

// ============================================================================
// Compilation Functions
// ============================================================================

/// Compile a request against an already-loaded link catalog.
pub fn compile(
    request: &QueryRequest,
    links: &[LinkRecord],
    options: &CompileOptions,
) -> CompileResult<CompiledQuery> {
    let dialect = options.dialect;

    // Step 1: Attribute the filter to its tables
    let filter = parse_filter(&request.condition_data, dialect)?;

    // Step 2: Per-table projections and required tables
    let projections = build_projections(request, filter.as_ref())?;

    // Step 3: Build the graph and resolve the join path
    let graph = JoinGraph::build(links)?;
    let path = graph.resolve_path(&projections.required_tables())?;

    // Step 4: Join conditions for every edge
    let steps = plan_joins(&graph, &path)?;

    // Step 5: Assemble and render
    let schema = request.schema().or(options.schema.as_deref());
    let assembled = assemble(&projections, &steps, filter.as_ref(), schema, dialect)?;
    let sql = assembled.to_sql(dialect);

    info!(
        dialect = %dialect,
        tables = assembled.tables.len(),
        joins = path.len(),
        columns = assembled.columns.len(),
        "compiled query"
    );

    Ok(CompiledQuery {
        sql,
        columns: assembled.columns,
        path,
        dialect,
    })
}

/// Compiler bound to a link provider. The catalog is read once per call.
#[derive(Debug)]
pub struct Compiler<P> {
    provider: P,
    options: CompileOptions,
}

impl<P: LinkProvider> Compiler<P> {
    pub fn new(provider: P, options: CompileOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Load the catalog and compile `request`.
    pub fn compile(&self, request: &QueryRequest) -> CompileResult<CompiledQuery> {
        let links = self.provider.load_links()?;
        compile(request, &links, &self.options)
    }

    /// Load the catalog and resolve the join path for `tables` only.
    pub fn resolve<S: AsRef<str>>(&self, tables: &[S]) -> CompileResult<ResolvedJoinPath> {
        let links = self.provider.load_links()?;
        let graph = JoinGraph::build(&links)?;
        Ok(graph.resolve_path(tables)?)
    }
}
