use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database name, used in log events
    pub name: String,

    /// Appended to a tracked type's table name to name its history table
    pub revision_table_suffix: String,

    /// Module that declarations without one are placed in
    pub default_module: String,

    /// Reject writes whose foreign keys name a missing row
    pub enforce_foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "rustmemodb".to_string(),
            revision_table_suffix: "_revision".to_string(),
            default_module: crate::model::DEFAULT_MODULE.to_string(),
            enforce_foreign_keys: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database name
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the history table suffix
    pub fn revision_table_suffix(mut self, suffix: &str) -> Self {
        self.revision_table_suffix = suffix.to_string();
        self
    }

    /// Set the default module
    pub fn default_module(mut self, module: &str) -> Self {
        self.default_module = module.to_string();
        self
    }

    /// Enable or disable foreign-key checks
    pub fn enforce_foreign_keys(mut self, enforce: bool) -> Self {
        self.enforce_foreign_keys = enforce;
        self
    }

    /// Parse from JSON; missing keys keep their defaults.
    ///
    /// ```
    /// # use revised::DatabaseConfig;
    /// let config = DatabaseConfig::from_json(r#"{"revision_table_suffix": "_history"}"#).unwrap();
    /// assert_eq!(config.revision_table_suffix, "_history");
    /// assert!(config.enforce_foreign_keys);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
