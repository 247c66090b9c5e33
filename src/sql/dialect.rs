//! Target databases.
//!
//! Assembled statements only use SELECT, derived tables, INNER JOIN and
//! GROUP BY, which every supported database spells the same way. What
//! differs is how identifiers are delimited:
//!
//! | Dialect  | Identifier     | Escape          |
//! |----------|----------------|-----------------|
//! | Postgres | `"name"`       | `""`            |
//! | DuckDB   | `"name"`       | `""`            |
//! | MySQL    | `` `name` ``   | ``` `` ```      |
//! | T-SQL    | `[name]`       | `]]`            |
//!
//! Each dialect also names the `sqlparser` dialect used to read filter
//! expressions written for that database.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlparser::dialect::{DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    #[serde(alias = "duck")]
    DuckDb,
    MySql,
    #[serde(alias = "mssql", alias = "sqlserver")]
    TSql,
}

/// Opening and closing identifier delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentQuotes {
    pub open: char,
    pub close: char,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [Dialect::Postgres, Dialect::DuckDb, Dialect::MySql, Dialect::TSql];

    /// Dialect name for display/logging.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::DuckDb => "duckdb",
            Dialect::MySql => "mysql",
            Dialect::TSql => "tsql",
        }
    }

    pub fn ident_quotes(self) -> IdentQuotes {
        let (open, close) = match self {
            Dialect::Postgres | Dialect::DuckDb => ('"', '"'),
            Dialect::MySql => ('`', '`'),
            Dialect::TSql => ('[', ']'),
        };
        IdentQuotes { open, close }
    }

    /// Delimit an identifier (schema, table, column or alias). A closing
    /// delimiter inside the name is doubled.
    pub fn quote_identifier(self, ident: &str) -> String {
        let mut out = String::with_capacity(ident.len() + 2);
        self.write_identifier(&mut out, ident);
        out
    }

    /// Append a delimited identifier to `out`.
    pub fn write_identifier(self, out: &mut String, ident: &str) {
        let IdentQuotes { open, close } = self.ident_quotes();
        out.push(open);
        for ch in ident.chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
    }

    /// Whether column names compare case-insensitively, quoted or not.
    /// A derived table must not expose two names differing only in case on
    /// these databases.
    pub fn case_insensitive_columns(self) -> bool {
        !matches!(self, Dialect::Postgres)
    }

    /// The name an unquoted identifier resolves to. Postgres folds it to
    /// lower case; the others keep it and match case-insensitively.
    pub fn fold_unquoted(self, ident: &str) -> String {
        match self {
            Dialect::Postgres => ident.to_lowercase(),
            _ => ident.to_string(),
        }
    }

    /// Whether two column names refer to the same column.
    pub fn same_column(self, a: &str, b: &str) -> bool {
        if self.case_insensitive_columns() {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }

    /// The matching `sqlparser` dialect, used to parse filter expressions
    /// written against this database.
    pub fn parser_dialect(self) -> Box<dyn sqlparser::dialect::Dialect> {
        match self {
            Dialect::Postgres => Box::new(PostgreSqlDialect {}),
            Dialect::DuckDb => Box::new(DuckDbDialect {}),
            Dialect::MySql => Box::new(MySqlDialect {}),
            Dialect::TSql => Box::new(MsSqlDialect {}),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a dialect name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown SQL dialect: '{0}' (expected postgres, duckdb, mysql or tsql)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "duckdb" | "duck" => Ok(Dialect::DuckDb),
            "mysql" => Ok(Dialect::MySql),
            "tsql" | "mssql" | "sqlserver" => Ok(Dialect::TSql),
            other => Err(UnknownDialect(other.to_string())),
        }
    }
}
