//! Configuration module for tablelink.
//!
//! Handles the link catalog source, compile defaults and environment variables.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, CatalogSource, CompileSettings, Settings, SettingsError,
};
