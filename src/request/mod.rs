//! Caller-facing query request.
//!
//! The request mirrors the payload of the grid query builder:
//!
//! ```json
//! {
//!   "schemaName": "dw",
//!   "dimensionData": [{"table": "enrollment_term_dim", "columns": "term_year", "aliasName": "Year"}],
//!   "measureData": [{"table": "enrollment_fact", "columns": "headcount", "operator": "sum", "aliasName": "Headcount"}],
//!   "conditionData": "(enrollment_term_dim.term_year >= 2019)"
//! }
//! ```
//!
//! `columns` may carry several columns joined by `$&`; each becomes its own
//! projection. [`build_projections`] turns a request (plus its parsed filter)
//! into per-table projections and the outer column list.

mod projection;

pub use projection::{
    build_projections, DimensionColumn, MeasureColumn, OutputColumn, ProjectionSet,
    TableProjection,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sql::{self, Expr};

/// Separator for several columns packed into one `columns` field.
pub const MULTI_COLUMN_SEPARATOR: &str = "$&";

/// Errors in the shape of a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Unknown aggregate operator '{operator}' for table '{table}'")]
    UnknownOperator { table: String, operator: String },

    #[error("A {kind} entry has no table name")]
    MissingTable { kind: &'static str },

    #[error("The {kind} entry for table '{table}' has no columns")]
    EmptyColumns { kind: &'static str, table: String },
}

/// A full query request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Schema prefix for every inner FROM.
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub dimension_data: Vec<DimensionSpec>,
    #[serde(default)]
    pub measure_data: Vec<MeasureSpec>,
    /// Boolean filter over `table.column` references; may be empty.
    #[serde(default)]
    pub condition_data: String,
}

impl QueryRequest {
    /// Parse a request from its JSON payload.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The schema prefix, ignoring a blank value.
    pub fn schema(&self) -> Option<&str> {
        self.schema_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A plain (grouped) output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSpec {
    pub table: String,
    pub columns: String,
    #[serde(default)]
    pub alias_name: String,
}

/// An aggregated output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureSpec {
    pub table: String,
    pub columns: String,
    #[serde(alias = "operator2")]
    pub operator: String,
    #[serde(default)]
    pub alias_name: String,
}

/// Aggregate applied to a measure column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Sum,
    Count,
    Avg,
    Min,
    Max,
    CountDistinct,
}

impl AggregateOp {
    /// Wrap an expression in this aggregate.
    pub fn apply(self, expr: Expr) -> Expr {
        match self {
            AggregateOp::Sum => sql::sum(expr),
            AggregateOp::Count => sql::count(expr),
            AggregateOp::Avg => sql::avg(expr),
            AggregateOp::Min => sql::min(expr),
            AggregateOp::Max => sql::max(expr),
            AggregateOp::CountDistinct => sql::count_distinct(expr),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Count => "count",
            AggregateOp::Avg => "avg",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::CountDistinct => "count_distinct",
        }
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregateOp::Sum),
            "count" => Ok(AggregateOp::Count),
            "avg" | "average" => Ok(AggregateOp::Avg),
            "min" => Ok(AggregateOp::Min),
            "max" => Ok(AggregateOp::Max),
            "count_distinct" | "distinct_count" => Ok(AggregateOp::CountDistinct),
            other => Err(other.to_string()),
        }
    }
}
