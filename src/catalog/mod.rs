//! Link catalog loading.
//!
//! A link record says that some columns of one table join, position by
//! position, to columns of another. Records come from an external metadata
//! store and are read once per resolution request through a [`LinkProvider`].
//!
//! # Providers
//!
//! - [`StaticLinkProvider`] - records held in memory
//! - [`JsonLinkProvider`] - a JSON array of link rows on disk
//! - [`SqliteLinkProvider`] - rows returned by a SELECT against a SQLite catalog
//! - [`CachedLinkProvider`] - loads from an inner provider once, then serves clones

mod json;
mod sqlite;

pub use json::JsonLinkProvider;
pub use sqlite::{SqliteLinkProvider, DEFAULT_LINK_QUERY, DEFAULT_SCOPED_LINK_QUERY};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Delimiter used when a catalog stores column lists as one string.
pub const DEFAULT_COLUMN_DELIMITER: &str = ",";

/// Errors that can occur while reading the link catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Link query must return 4 columns (left table, right table, left columns, right columns), got {found}")]
    QueryShape { found: usize },

    #[error("Malformed link row {row}: {message}")]
    MalformedRow { row: usize, message: String },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// One catalog entry: `left_columns[i]` joins to `right_columns[i]`.
///
/// Column counts are checked when the record enters a
/// [`JoinGraph`](crate::graph::JoinGraph), not here, so a broken catalog row
/// still loads and is reported with its table names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub left_table: String,
    pub right_table: String,
    pub left_columns: Vec<String>,
    pub right_columns: Vec<String>,
}

impl LinkRecord {
    pub fn new(left_table: &str, right_table: &str, left_columns: &[&str], right_columns: &[&str]) -> Self {
        Self {
            left_table: left_table.into(),
            right_table: right_table.into(),
            left_columns: left_columns.iter().map(|c| c.to_string()).collect(),
            right_columns: right_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Build a record from delimited column strings as stored in the catalog.
    pub fn from_delimited(
        left_table: &str,
        right_table: &str,
        left_columns: &str,
        right_columns: &str,
        delimiter: &str,
    ) -> Self {
        Self {
            left_table: left_table.trim().into(),
            right_table: right_table.trim().into(),
            left_columns: split_column_list(left_columns, delimiter),
            right_columns: split_column_list(right_columns, delimiter),
        }
    }
}

/// Split a delimited column list into an ordered sequence.
///
/// Catalog exports sometimes store the list as a tuple literal such as
/// `(term_id,)`, so one surrounding pair of parentheses is stripped first.
/// Pieces are trimmed and empty pieces dropped.
///
/// ```
/// use tablelink::catalog::split_column_list;
///
/// assert_eq!(split_column_list("(term_id,)", ","), vec!["term_id"]);
/// assert_eq!(split_column_list(" a , b ", ","), vec!["a", "b"]);
/// ```
pub fn split_column_list(raw: &str, delimiter: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);

    let delimiter = if delimiter.is_empty() {
        DEFAULT_COLUMN_DELIMITER
    } else {
        delimiter
    };

    inner
        .split(delimiter)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(String::from)
        .collect()
}

/// Source of link records.
///
/// Each call performs one blocking read of the catalog.
pub trait LinkProvider {
    fn load_links(&self) -> CatalogResult<Vec<LinkRecord>>;
}

impl<P: LinkProvider + ?Sized> LinkProvider for Box<P> {
    fn load_links(&self) -> CatalogResult<Vec<LinkRecord>> {
        (**self).load_links()
    }
}

/// In-memory link records.
#[derive(Debug, Clone, Default)]
pub struct StaticLinkProvider {
    links: Vec<LinkRecord>,
}

impl StaticLinkProvider {
    pub fn new(links: Vec<LinkRecord>) -> Self {
        Self { links }
    }
}

impl LinkProvider for StaticLinkProvider {
    fn load_links(&self) -> CatalogResult<Vec<LinkRecord>> {
        Ok(self.links.clone())
    }
}

/// Read-only memoisation around another provider.
///
/// The first successful load is kept for the provider's lifetime; a failed
/// load is not cached and will be retried on the next call.
#[derive(Debug)]
pub struct CachedLinkProvider<P> {
    inner: P,
    links: OnceCell<Vec<LinkRecord>>,
}

impl<P: LinkProvider> CachedLinkProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            links: OnceCell::new(),
        }
    }

    /// Whether the catalog has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.links.get().is_some()
    }
}

impl<P: LinkProvider> LinkProvider for CachedLinkProvider<P> {
    fn load_links(&self) -> CatalogResult<Vec<LinkRecord>> {
        let links = self.links.get_or_try_init(|| {
            let links = self.inner.load_links()?;
            debug!(count = links.len(), "cached link catalog");
            Ok::<_, CatalogError>(links)
        })?;
        Ok(links.clone())
    }
}
