use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{Catalog, StorageEngine, Table, TableSchema};
use crate::core::{DbError, Result, Row, Value};

pub struct InMemoryStorage {
    /// Tables, each behind its own lock
    tables: RwLock<HashMap<String, Arc<RwLock<Table>>>>,
    /// Schemas only; swapped wholesale on DDL
    catalog: RwLock<Catalog>,
    enforce_foreign_keys: bool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            catalog: RwLock::new(Catalog::new()),
            enforce_foreign_keys: true,
        }
    }

    pub fn with_foreign_keys(mut self, enforce: bool) -> Self {
        self.enforce_foreign_keys = enforce;
        self
    }

    /// Handle on a table for direct access.
    pub fn get_table(&self, name: &str) -> Result<Arc<RwLock<Table>>> {
        self.tables
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn catalog(&self) -> Result<Catalog> {
        Ok(self.catalog.read()?.clone())
    }

    /// Every non-NULL foreign-key value in `row` must name an existing row.
    fn check_references(&self, schema: &TableSchema, row: &Row) -> Result<()> {
        if !self.enforce_foreign_keys {
            return Ok(());
        }
        for (column, value) in schema.schema().columns().iter().zip(row) {
            let Some(target) = &column.references else {
                continue;
            };
            // NULL and self-references are not checked here
            if value.is_null() || target.table == schema.name() {
                continue;
            }
            let handle = self.get_table(&target.table)?;
            let found = !handle.read()?.scan_eq(&target.column, value)?.is_empty();
            if !found {
                return Err(DbError::ConstraintViolation(format!(
                    "Column '{}' references non-existent key {} in '{}'",
                    column.name, value, target.table
                )));
            }
        }
        Ok(())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for InMemoryStorage {
    fn create_table(&self, schema: TableSchema) -> Result<()> {
        let mut catalog = self.catalog.write()?;
        let mut tables = self.tables.write()?;

        let name = schema.name().to_string();
        let next = catalog.with_table(schema.clone())?;
        tables.insert(name, Arc::new(RwLock::new(Table::new(schema)?)));
        *catalog = next;
        Ok(())
    }

    fn drop_table(&self, table: &str) -> Result<()> {
        let mut catalog = self.catalog.write()?;
        let next = catalog.without_table(table)?;
        self.tables.write()?.remove(table);
        *catalog = next;
        Ok(())
    }

    fn insert_row(&self, table: &str, row: Row) -> Result<i64> {
        let schema = self.get_schema(table)?;
        self.check_references(&schema, &row)?;
        let handle = self.get_table(table)?;
        let mut table = handle.write()?;
        table.insert(row)
    }

    fn update_row(&self, table: &str, id: i64, row: Row) -> Result<bool> {
        let schema = self.get_schema(table)?;
        self.check_references(&schema, &row)?;
        let handle = self.get_table(table)?;
        let mut table = handle.write()?;
        table.update(id, row)
    }

    fn delete_row(&self, table: &str, id: i64) -> Result<bool> {
        let handle = self.get_table(table)?;
        let mut table = handle.write()?;
        Ok(table.delete(id))
    }

    fn get_row(&self, table: &str, id: i64) -> Result<Option<Row>> {
        let handle = self.get_table(table)?;
        let table = handle.read()?;
        Ok(table.get(id))
    }

    fn scan_table(&self, table: &str) -> Result<Vec<Row>> {
        let handle = self.get_table(table)?;
        let table = handle.read()?;
        Ok(table.scan())
    }

    fn scan_eq(&self, table: &str, column: &str, value: &Value) -> Result<Vec<Row>> {
        let handle = self.get_table(table)?;
        let table = handle.read()?;
        table.scan_eq(column, value)
    }

    fn get_schema(&self, table: &str) -> Result<TableSchema> {
        Ok(self.catalog.read()?.get_table(table)?.clone())
    }

    fn table_exists(&self, name: &str) -> bool {
        self.catalog
            .read()
            .map(|catalog| catalog.table_exists(name))
            .unwrap_or(false)
    }

    fn list_tables(&self) -> Vec<String> {
        self.catalog
            .read()
            .map(|catalog| catalog.list_tables().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn row_count(&self, table: &str) -> Result<usize> {
        let handle = self.get_table(table)?;
        let table = handle.read()?;
        Ok(table.row_count())
    }
}
