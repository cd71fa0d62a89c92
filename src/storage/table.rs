use std::collections::{BTreeMap, HashMap};

use crate::core::{Column, DbError, Result, Row, Schema, Value};

#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    schema: Schema,
    unique_together: Vec<Vec<String>>,
    pub indexes: Vec<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(columns),
            unique_together: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn with_unique_together(mut self, sets: Vec<Vec<String>>) -> Self {
        self.unique_together = sets;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn unique_together(&self) -> &[Vec<String>] {
        &self.unique_together
    }

    pub fn is_indexed(&self, column: &str) -> bool {
        self.indexes.iter().any(|idx| idx == column)
    }
}

/// Rows of one table keyed by their integer primary key.
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    pk_index: usize,
    rows: BTreeMap<i64, Row>,
    next_row_id: i64,
    indexes: HashMap<String, HashMap<Value, Vec<i64>>>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Result<Self> {
        let pk_index = schema.schema().primary_key_index().ok_or_else(|| {
            DbError::ExecutionError(format!("Table '{}' has no primary key", schema.name()))
        })?;
        let mut table = Self {
            schema: TableSchema {
                indexes: Vec::new(),
                ..schema.clone()
            },
            pk_index,
            rows: BTreeMap::new(),
            next_row_id: 1,
            indexes: HashMap::new(),
        };
        for column in &schema.indexes {
            table.create_index(column)?;
        }
        Ok(table)
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn insert(&mut self, mut row: Row) -> Result<i64> {
        let id = match row.get(self.pk_index).and_then(Value::as_i64) {
            Some(id) => {
                if self.rows.contains_key(&id) {
                    return Err(DbError::ConstraintViolation(format!(
                        "Unique constraint violation: Column '{}' already contains value {}",
                        self.pk_column().name,
                        id
                    )));
                }
                id
            }
            None => self.next_row_id,
        };
        if let Some(slot) = row.get_mut(self.pk_index) {
            *slot = Value::Integer(id);
        }

        self.validate_row(&row)?;
        self.check_uniqueness(&row, None)?;

        self.next_row_id = self.next_row_id.max(id + 1);
        self.update_indexes(id, &row);
        self.rows.insert(id, row);
        Ok(id)
    }

    pub fn update(&mut self, id: i64, mut row: Row) -> Result<bool> {
        if !self.rows.contains_key(&id) {
            return Ok(false);
        }
        if let Some(slot) = row.get_mut(self.pk_index) {
            *slot = Value::Integer(id);
        }
        self.validate_row(&row)?;
        self.check_uniqueness(&row, Some(id))?;

        if let Some(old) = self.rows.insert(id, row.clone()) {
            self.remove_from_indexes(id, &old);
        }
        self.update_indexes(id, &row);
        Ok(true)
    }

    pub fn delete(&mut self, id: i64) -> bool {
        match self.rows.remove(&id) {
            Some(old) => {
                self.remove_from_indexes(id, &old);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: i64) -> Option<Row> {
        self.rows.get(&id).cloned()
    }

    pub fn scan(&self) -> Vec<Row> {
        self.rows.values().cloned().collect()
    }

    /// Rows whose `column` equals `value`, through the index when there is one.
    pub fn scan_eq(&self, column: &str, value: &Value) -> Result<Vec<Row>> {
        let col_idx = self.column_index(column)?;

        if let Some(index) = self.indexes.get(column) {
            let mut ids = index.get(value).cloned().unwrap_or_default();
            ids.sort_unstable();
            return Ok(ids.iter().filter_map(|id| self.rows.get(id).cloned()).collect());
        }

        Ok(self
            .rows
            .values()
            .filter(|row| &row[col_idx] == value)
            .cloned()
            .collect())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn create_index(&mut self, column_name: &str) -> Result<()> {
        if self.indexes.contains_key(column_name) {
            return Ok(());
        }
        let col_idx = self.column_index(column_name)?;
        let mut index: HashMap<Value, Vec<i64>> = HashMap::new();
        for (id, row) in &self.rows {
            index.entry(row[col_idx].clone()).or_default().push(*id);
        }
        self.indexes.insert(column_name.to_string(), index);
        self.schema.indexes.push(column_name.to_string());
        Ok(())
    }

    fn pk_column(&self) -> &Column {
        &self.schema.schema().columns()[self.pk_index]
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.schema
            .schema()
            .find_column_index(column)
            .ok_or_else(|| DbError::ColumnNotFound(column.to_string(), self.schema.name.clone()))
    }

    fn validate_row(&self, row: &Row) -> Result<()> {
        let columns = self.schema.schema().columns();
        if row.len() != columns.len() {
            return Err(DbError::ExecutionError(format!(
                "Expected {} columns, got {}",
                columns.len(),
                row.len()
            )));
        }
        for (column, value) in columns.iter().zip(row.iter()) {
            column.validate(value)?;
        }
        Ok(())
    }

    fn check_uniqueness(&self, row: &Row, ignore_id: Option<i64>) -> Result<()> {
        let others = || {
            self.rows
                .iter()
                .filter(move |(id, _)| Some(**id) != ignore_id)
                .map(|(_, other)| other)
        };

        for (col_idx, column) in self.schema.schema().columns().iter().enumerate() {
            if !column.unique || column.primary_key {
                continue;
            }
            let value = &row[col_idx];
            // NULLs never collide
            if value.is_null() {
                continue;
            }
            if others().any(|other| &other[col_idx] == value) {
                return Err(DbError::ConstraintViolation(format!(
                    "Unique constraint violation: Column '{}' already contains value {}",
                    column.name, value
                )));
            }
        }

        for set in &self.schema.unique_together {
            let indices = set
                .iter()
                .map(|name| self.column_index(name))
                .collect::<Result<Vec<_>>>()?;
            if indices.iter().any(|&i| row[i].is_null()) {
                continue;
            }
            if others().any(|other| indices.iter().all(|&i| other[i] == row[i])) {
                let values: Vec<String> = indices.iter().map(|&i| row[i].to_string()).collect();
                return Err(DbError::ConstraintViolation(format!(
                    "Unique constraint violation: ({}) already contains ({})",
                    set.join(", "),
                    values.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn update_indexes(&mut self, id: i64, row: &Row) {
        for (col_name, index) in &mut self.indexes {
            if let Some(col_idx) = self.schema.schema.find_column_index(col_name) {
                index.entry(row[col_idx].clone()).or_default().push(id);
            }
        }
    }

    fn remove_from_indexes(&mut self, id: i64, row: &Row) {
        for (col_name, index) in &mut self.indexes {
            if let Some(col_idx) = self.schema.schema.find_column_index(col_name)
                && let Some(ids) = index.get_mut(&row[col_idx])
            {
                ids.retain(|&x| x != id);
            }
        }
    }
}
