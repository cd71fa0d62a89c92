use crate::core::{Row, Value};
use crate::fields::{DEFAULT_ALLOWED_ARGS, allowed_arguments, field_type_names};
use crate::model::{ModelType, Record};

/// Tabular view of records or of type metadata, for printing.
#[derive(Debug)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// One row per record, one column per field of `model`.
    pub fn from_records(model: &ModelType, records: &[Record]) -> Self {
        let columns: Vec<String> = model
            .meta()
            .field_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|name| record.get(name).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// The fields of `model`: name, kind, nullability, uniqueness, default
    /// and foreign-key target.
    pub fn describe(model: &ModelType) -> Self {
        let columns = ["field", "type", "null", "unique", "default", "references"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rows = model
            .meta()
            .fields
            .iter()
            .map(|field| {
                vec![
                    Value::from(field.name()),
                    Value::from(field.type_name()),
                    Value::Boolean(field.is_nullable()),
                    Value::Boolean(field.is_unique() || field.is_primary_key()),
                    field.default_value(),
                    field
                        .relation()
                        .map(|r| Value::from(r.to.as_str()))
                        .unwrap_or(Value::Null),
                ]
            })
            .collect();
        Self { columns, rows }
    }

    /// Every field kind with the constructor arguments it accepts on top of
    /// the common ones.
    pub fn field_types() -> Self {
        let rows = field_type_names()
            .into_iter()
            .map(|name| {
                let args = allowed_arguments(name)
                    .map(|args| args.join(", "))
                    .unwrap_or_default();
                vec![Value::from(name), Value::from(args)]
            })
            .collect();
        Self::new(vec!["type".to_string(), "arguments".to_string()], rows)
    }

    /// Arguments every field kind accepts.
    pub fn common_arguments() -> String {
        DEFAULT_ALLOWED_ARGS.join(", ")
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the table with a header, a separator and a row count.
    pub fn render(&self) -> String {
        if self.columns.is_empty() {
            return "Empty result set\n".to_string();
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (i, value) in row.iter().enumerate() {
                widths[i] = widths[i].max(value.to_string().len());
            }
        }

        let mut out = String::new();
        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{:width$}", col, width = widths[i]))
            .collect();
        out.push_str(header.join(" | ").trim_end());
        out.push('\n');

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        out.push_str(&separator);
        out.push('\n');

        for row in &self.rows {
            let row_str: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, val)| format!("{:width$}", val.to_string(), width = widths[i]))
                .collect();
            out.push_str(row_str.join(" | ").trim_end());
            out.push('\n');
        }

        out.push_str(&format!("\n{} row(s)\n", self.rows.len()));
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}
