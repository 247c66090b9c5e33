//! JSON file link catalog.
//!
//! The file holds an array of link rows. Column lists may be arrays or
//! delimited strings, and the field names of the original catalog table
//! (`lefttablename`, `leftcolumnnames`, ...) are accepted alongside
//! snake_case and camelCase:
//!
//! ```json
//! [
//!   {"leftTable": "enrollment_fact", "rightTable": "enrollment_term_dim",
//!    "leftColumns": "term_id", "rightColumns": ["term_id"]}
//! ]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{split_column_list, CatalogError, CatalogResult, LinkProvider, LinkRecord};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnList {
    Delimited(String),
    List(Vec<String>),
}

impl ColumnList {
    fn into_columns(self, delimiter: &str) -> Vec<String> {
        match self {
            ColumnList::Delimited(raw) => split_column_list(&raw, delimiter),
            ColumnList::List(columns) => columns
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    #[serde(alias = "leftTable", alias = "lefttablename")]
    left_table: String,
    #[serde(alias = "rightTable", alias = "righttablename")]
    right_table: String,
    #[serde(alias = "leftColumns", alias = "leftcolumnnames")]
    left_columns: ColumnList,
    #[serde(alias = "rightColumns", alias = "rightcolumnnames")]
    right_columns: ColumnList,
}

/// Parse a JSON array of link rows.
pub(crate) fn parse_link_rows(json: &str, delimiter: &str) -> CatalogResult<Vec<LinkRecord>> {
    let rows: Vec<LinkRow> = serde_json::from_str(json)?;
    Ok(rows
        .into_iter()
        .map(|row| LinkRecord {
            left_table: row.left_table.trim().to_string(),
            right_table: row.right_table.trim().to_string(),
            left_columns: row.left_columns.into_columns(delimiter),
            right_columns: row.right_columns.into_columns(delimiter),
        })
        .collect())
}

/// Link records read from a JSON file on every load.
#[derive(Debug, Clone)]
pub struct JsonLinkProvider {
    path: PathBuf,
    delimiter: String,
}

impl JsonLinkProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: super::DEFAULT_COLUMN_DELIMITER.to_string(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LinkProvider for JsonLinkProvider {
    fn load_links(&self) -> CatalogResult<Vec<LinkRecord>> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| CatalogError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let links = parse_link_rows(&content, &self.delimiter)?;
        debug!(path = %self.path.display(), count = links.len(), "loaded link catalog");
        Ok(links)
    }
}
