//! SQLite link catalog.
//!
//! Runs a SELECT returning four text columns in this order: left table,
//! right table, left columns, right columns. Column lists are delimited
//! strings. When a scope is configured it is bound as `?1`, which lets one
//! catalog table hold links for several grid configurations.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, Row};
use tracing::debug;

use super::{CatalogError, CatalogResult, LinkProvider, LinkRecord, DEFAULT_COLUMN_DELIMITER};

/// Query used when none is configured.
pub const DEFAULT_LINK_QUERY: &str =
    "SELECT left_table, right_table, left_columns, right_columns FROM join_links";

/// Query used when a scope is set and the query was left at its default.
pub const DEFAULT_SCOPED_LINK_QUERY: &str =
    "SELECT left_table, right_table, left_columns, right_columns FROM join_links WHERE scope = ?1";

/// Link records read from a SQLite database.
pub struct SqliteLinkProvider {
    conn: Connection,
    query: String,
    scope: Option<String>,
    delimiter: String,
}

impl std::fmt::Debug for SqliteLinkProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLinkProvider")
            .field("query", &self.query)
            .field("scope", &self.scope)
            .field("delimiter", &self.delimiter)
            .finish()
    }
}

impl SqliteLinkProvider {
    /// Open a catalog database read-only.
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection (e.g. an in-memory database in tests).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            query: DEFAULT_LINK_QUERY.to_string(),
            scope: None,
            delimiter: DEFAULT_COLUMN_DELIMITER.to_string(),
        }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.to_string();
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    pub fn with_delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    /// The SELECT that will actually run.
    pub fn effective_query(&self) -> &str {
        if self.scope.is_some() && self.query == DEFAULT_LINK_QUERY {
            DEFAULT_SCOPED_LINK_QUERY
        } else {
            &self.query
        }
    }

    fn text_column(row: &Row<'_>, row_index: usize, idx: usize) -> CatalogResult<String> {
        let value: Option<String> = row.get(idx)?;
        value.ok_or_else(|| CatalogError::MalformedRow {
            row: row_index,
            message: format!("column {} is NULL", idx + 1),
        })
    }
}

impl LinkProvider for SqliteLinkProvider {
    fn load_links(&self) -> CatalogResult<Vec<LinkRecord>> {
        let query = self.effective_query();
        let mut stmt = self.conn.prepare(query)?;

        let found = stmt.column_count();
        if found != 4 {
            return Err(CatalogError::QueryShape { found });
        }

        let mut rows = match &self.scope {
            Some(scope) => stmt.query(params![scope])?,
            None => stmt.query([])?,
        };

        let mut links = Vec::new();
        let mut row_index = 0;
        while let Some(row) = rows.next()? {
            let left_table = Self::text_column(row, row_index, 0)?;
            let right_table = Self::text_column(row, row_index, 1)?;
            let left_columns = Self::text_column(row, row_index, 2)?;
            let right_columns = Self::text_column(row, row_index, 3)?;

            links.push(LinkRecord::from_delimited(
                &left_table,
                &right_table,
                &left_columns,
                &right_columns,
                &self.delimiter,
            ));
            row_index += 1;
        }

        debug!(query, scope = ?self.scope, count = links.len(), "loaded link catalog");
        Ok(links)
    }
}
