use super::table::TableSchema;
use crate::core::{Result, Row, Value};

/// Storage engine trait - allows pluggable storage backends.
///
/// Rows are addressed by their integer primary key. Implementations enforce
/// column, uniqueness and foreign-key constraints on write.
pub trait StorageEngine: Send + Sync {
    /// Create a new table with the given schema
    fn create_table(&self, schema: TableSchema) -> Result<()>;

    /// Drop a table and all of its rows
    fn drop_table(&self, table: &str) -> Result<()>;

    /// Insert a row, assigning the primary key when it is NULL
    fn insert_row(&self, table: &str, row: Row) -> Result<i64>;

    /// Replace the row stored under `id`
    fn update_row(&self, table: &str, id: i64, row: Row) -> Result<bool>;

    /// Remove the row stored under `id`
    fn delete_row(&self, table: &str, id: i64) -> Result<bool>;

    /// Fetch one row by primary key
    fn get_row(&self, table: &str, id: i64) -> Result<Option<Row>>;

    /// Scan all rows in a table, in primary-key order
    fn scan_table(&self, table: &str) -> Result<Vec<Row>>;

    /// Rows whose `column` equals `value`
    fn scan_eq(&self, table: &str, column: &str, value: &Value) -> Result<Vec<Row>>;

    /// Get the schema for a table
    fn get_schema(&self, table: &str) -> Result<TableSchema>;

    /// Check if a table exists
    fn table_exists(&self, name: &str) -> bool;

    /// List all table names
    fn list_tables(&self) -> Vec<String>;

    /// Get table row count
    fn row_count(&self, table: &str) -> Result<usize>;
}
