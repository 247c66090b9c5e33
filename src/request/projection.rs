//! Per-table projections derived from a request.

use serde::Serialize;

use super::{AggregateOp, QueryRequest, RequestError, MULTI_COLUMN_SEPARATOR};
use crate::filter::FilterExpr;

/// A grouped column and its output alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionColumn {
    pub column: String,
    pub alias: String,
}

/// An aggregated column and its output alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureColumn {
    pub column: String,
    pub op: AggregateOp,
    pub alias: String,
}

/// Everything one table's inner SELECT must expose, except join keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableProjection {
    pub table: String,
    pub dimensions: Vec<DimensionColumn>,
    pub measures: Vec<MeasureColumn>,
    /// Columns read by the outer WHERE clause.
    pub filter_columns: Vec<String>,
}

impl TableProjection {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            dimensions: Vec::new(),
            measures: Vec::new(),
            filter_columns: Vec::new(),
        }
    }

    pub fn has_measures(&self) -> bool {
        !self.measures.is_empty()
    }
}

/// A column of the final result: `"table"."alias"` in the outer SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OutputColumn {
    pub table: String,
    pub alias: String,
}

/// Projections for every required table plus the outer column list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionSet {
    /// One entry per table: dimension tables first, then measure tables,
    /// then filter tables, each in first-seen order.
    pub tables: Vec<TableProjection>,
    /// Dimensions then measures, in request order.
    pub outputs: Vec<OutputColumn>,
}

impl ProjectionSet {
    /// Table names in the order the path resolver should see them.
    pub fn required_tables(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table.as_str()).collect()
    }

    pub fn get(&self, table: &str) -> Option<&TableProjection> {
        self.tables.iter().find(|t| t.table == table)
    }

    fn entry(&mut self, table: &str) -> &mut TableProjection {
        let idx = match self.tables.iter().position(|t| t.table == table) {
            Some(idx) => idx,
            None => {
                self.tables.push(TableProjection::new(table));
                self.tables.len() - 1
            }
        };
        &mut self.tables[idx]
    }

    fn push_output(&mut self, table: &str, alias: &str) {
        let output = OutputColumn {
            table: table.to_string(),
            alias: alias.to_string(),
        };
        if !self.outputs.contains(&output) {
            self.outputs.push(output);
        }
    }
}

/// Split a `$&`-joined column field. A `table.` prefix matching the entry's
/// own table is dropped.
fn split_columns(table: &str, raw: &str) -> Vec<String> {
    let prefix = format!("{}.", table);
    raw.split(MULTI_COLUMN_SEPARATOR)
        .map(str::trim)
        .map(|c| c.strip_prefix(&prefix).unwrap_or(c))
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

/// Output alias for one column of an entry. `fallback` is used when the
/// entry has no `aliasName`.
fn alias_for(alias_name: &str, column: &str, multi: bool, fallback: String) -> String {
    let alias_name = alias_name.trim();
    match (alias_name.is_empty(), multi) {
        (true, _) => fallback,
        (false, false) => alias_name.to_string(),
        (false, true) => format!("{}_{}", alias_name, column),
    }
}

fn checked_table<'a>(table: &'a str, kind: &'static str) -> Result<&'a str, RequestError> {
    let table = table.trim();
    if table.is_empty() {
        return Err(RequestError::MissingTable { kind });
    }
    Ok(table)
}

/// Build per-table projections for `request`.
///
/// `filter` is the already-parsed `conditionData`; its tables join the
/// required set and its columns are exposed by their tables' inner SELECTs.
pub fn build_projections(
    request: &QueryRequest,
    filter: Option<&FilterExpr>,
) -> Result<ProjectionSet, RequestError> {
    let mut set = ProjectionSet::default();

    for spec in &request.dimension_data {
        let table = checked_table(&spec.table, "dimension")?;
        let columns = split_columns(table, &spec.columns);
        if columns.is_empty() {
            return Err(RequestError::EmptyColumns {
                kind: "dimension",
                table: table.to_string(),
            });
        }
        let multi = columns.len() > 1;
        for column in columns {
            let alias = alias_for(&spec.alias_name, &column, multi, column.clone());
            set.push_output(table, &alias);
            set.entry(table).dimensions.push(DimensionColumn { column, alias });
        }
    }

    for spec in &request.measure_data {
        let table = checked_table(&spec.table, "measure")?;
        let op: AggregateOp = spec
            .operator
            .parse()
            .map_err(|operator| RequestError::UnknownOperator {
                table: table.to_string(),
                operator,
            })?;
        let columns = split_columns(table, &spec.columns);
        if columns.is_empty() {
            return Err(RequestError::EmptyColumns {
                kind: "measure",
                table: table.to_string(),
            });
        }
        let multi = columns.len() > 1;
        for column in columns {
            // A bare column name would clash with the same column exposed
            // as a join key or filter column.
            let fallback = format!("{}_{}", op, column);
            let alias = alias_for(&spec.alias_name, &column, multi, fallback);
            set.push_output(table, &alias);
            set.entry(table).measures.push(MeasureColumn { column, op, alias });
        }
    }

    if let Some(filter) = filter {
        for fc in &filter.columns {
            let projection = set.entry(&fc.table);
            if !projection.filter_columns.contains(&fc.column) {
                projection.filter_columns.push(fc.column.clone());
            }
        }
    }

    Ok(set)
}
