use std::collections::HashMap;
use std::sync::Arc;

use super::TableSchema;
use crate::core::{DbError, Result};

/// Table metadata only. Immutable once built, so clones are cheap and
/// readers never block writers: every change produces a new catalog
/// (copy-on-write).
#[derive(Clone, Default)]
pub struct Catalog {
    tables: Arc<HashMap<String, TableSchema>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a NEW catalog with the table added; `self` is unchanged.
    pub fn with_table(&self, schema: TableSchema) -> Result<Self> {
        let name = schema.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(DbError::TableExists(name));
        }

        let mut tables = (*self.tables).clone();
        tables.insert(name, schema);
        Ok(Self {
            tables: Arc::new(tables),
        })
    }

    /// Returns a NEW catalog without the table.
    pub fn without_table(&self, name: &str) -> Result<Self> {
        if !self.tables.contains_key(name) {
            return Err(DbError::TableNotFound(name.to_string()));
        }

        let mut tables = (*self.tables).clone();
        tables.remove(name);
        Ok(Self {
            tables: Arc::new(tables),
        })
    }

    pub fn get_table(&self, name: &str) -> Result<&TableSchema> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
