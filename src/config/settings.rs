//! TOML-based configuration for tablelink.
//!
//! Supports a config file (tablelink.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [catalog]
//! source = "sqlite"
//! path = "${TABLELINK_HOME}/catalog.db"
//! query = "SELECT lefttablename, righttablename, leftcolumnnames, rightcolumnnames FROM join_path_tb_links WHERE grid = ?1"
//! scope = "enrollment"
//! delimiter = ","
//!
//! [compile]
//! dialect = "tsql"
//! schema = "dw"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{
    CatalogError, JsonLinkProvider, LinkProvider, SqliteLinkProvider, DEFAULT_COLUMN_DELIMITER,
};
use crate::compile::CompileOptions;
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("No catalog path configured (set [catalog] path)")]
    MissingCatalogPath,

    #[error("Failed to open link catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Where link records come from.
    pub catalog: CatalogSettings,

    /// Defaults for compilation.
    pub compile: CompileSettings,
}

/// Kind of link catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    #[default]
    Sqlite,
    Json,
}

/// Link catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub source: CatalogSource,

    /// Database or JSON file (supports ${ENV_VAR} expansion).
    pub path: Option<String>,

    /// SELECT returning the four link columns (sqlite only).
    pub query: Option<String>,

    /// Value bound as `?1` in the query (sqlite only).
    pub scope: Option<String>,

    /// Separator inside the column-list strings.
    pub delimiter: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            source: CatalogSource::default(),
            path: None,
            query: None,
            scope: None,
            delimiter: DEFAULT_COLUMN_DELIMITER.to_string(),
        }
    }
}

impl CatalogSettings {
    /// Get the catalog path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<PathBuf, SettingsError> {
        let raw = self
            .path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(SettingsError::MissingCatalogPath)?;
        Ok(PathBuf::from(expand_env_vars(raw)?))
    }

    /// Open the configured provider.
    pub fn provider(&self) -> Result<Box<dyn LinkProvider>, SettingsError> {
        let path = self.resolved_path()?;
        match self.source {
            CatalogSource::Json => Ok(Box::new(
                JsonLinkProvider::new(path).with_delimiter(&self.delimiter),
            )),
            CatalogSource::Sqlite => {
                let mut provider = SqliteLinkProvider::open(&path)?.with_delimiter(&self.delimiter);
                if let Some(query) = &self.query {
                    provider = provider.with_query(query);
                }
                if let Some(scope) = &self.scope {
                    provider = provider.with_scope(scope);
                }
                Ok(Box::new(provider))
            }
        }
    }
}

/// Compilation defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CompileSettings {
    pub dialect: Dialect,

    /// Schema used when a request carries no `schemaName`.
    pub schema: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `TABLELINK_CONFIG`
    /// 2. `./tablelink.toml`
    /// 3. `~/.config/tablelink/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("TABLELINK_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("tablelink.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tablelink").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Compile options from the `[compile]` section.
    pub fn compile_options(&self) -> CompileOptions {
        let options = CompileOptions::default().with_dialect(self.compile.dialect);
        match self.compile.schema.as_deref() {
            Some(schema) if !schema.trim().is_empty() => options.with_schema(schema.trim()),
            _ => options,
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.next_if_eq(&'{').is_some() {
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
