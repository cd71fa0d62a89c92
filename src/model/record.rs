use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::meta::ModelType;
use super::methods::DISPLAY_METHOD;
use crate::core::{DbError, Result, Row, Value};

/// Field name -> value.
pub type FieldValues = BTreeMap<String, Value>;

/// An instance of a record type.
///
/// Records are created through [`crate::Database::instantiate`] or loaded by
/// the database's query methods, so lifecycle hooks see every instance.
#[derive(Clone)]
pub struct Record {
    model: Arc<ModelType>,
    pk: Option<i64>,
    values: FieldValues,
    snapshot: Option<FieldValues>,
}

impl Record {
    /// A record with every non-key field at its default.
    pub(crate) fn with_defaults(model: Arc<ModelType>) -> Self {
        let values = model
            .meta()
            .fields
            .iter()
            .filter(|f| !f.is_primary_key())
            .map(|f| (f.name().to_string(), f.default_value()))
            .collect();
        Self {
            model,
            pk: None,
            values,
            snapshot: None,
        }
    }

    pub(crate) fn from_row(model: Arc<ModelType>, row: Row) -> Result<Self> {
        let meta = model.meta();
        if row.len() != meta.fields.len() {
            return Err(DbError::ExecutionError(format!(
                "Row for '{}' has {} values, expected {}",
                model.name(),
                row.len(),
                meta.fields.len()
            )));
        }

        let mut pk = None;
        let mut values = FieldValues::new();
        for (field, value) in meta.fields.iter().zip(row) {
            if field.is_primary_key() {
                pk = value.as_i64();
            } else {
                values.insert(field.name().to_string(), value);
            }
        }
        Ok(Self {
            model,
            pk,
            values,
            snapshot: None,
        })
    }

    pub(crate) fn to_row(&self) -> Row {
        self.model
            .meta()
            .fields
            .iter()
            .map(|field| {
                if field.is_primary_key() {
                    self.pk.map(Value::Integer).unwrap_or(Value::Null)
                } else {
                    self.values.get(field.name()).cloned().unwrap_or(Value::Null)
                }
            })
            .collect()
    }

    pub fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    pub fn pk(&self) -> Option<i64> {
        self.pk
    }

    pub(crate) fn set_pk(&mut self, pk: Option<i64>) {
        self.pk = pk;
    }

    /// Value of a field; `pk` and the primary key's own name both read the key.
    pub fn get(&self, name: &str) -> Result<Value> {
        if name == "pk" || name == self.model.meta().pk_name {
            return Ok(self.pk.map(Value::Integer).unwrap_or(Value::Null));
        }
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::FieldNotFound(name.to_string(), self.model.name().to_string()))
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if name == "pk" || name == self.model.meta().pk_name {
            self.pk = match value {
                Value::Null => None,
                other => Some(other.as_i64().ok_or_else(|| {
                    DbError::TypeMismatch(format!(
                        "Primary key of '{}' must be an integer",
                        self.model.name()
                    ))
                })?),
            };
            return Ok(());
        }
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(DbError::FieldNotFound(
                name.to_string(),
                self.model.name().to_string(),
            )),
        }
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut FieldValues {
        &mut self.values
    }

    /// Values captured when the record was last constructed, loaded or saved.
    pub fn snapshot(&self) -> Option<&FieldValues> {
        self.snapshot.as_ref()
    }

    pub(crate) fn set_snapshot(&mut self, snapshot: FieldValues) {
        self.snapshot = Some(snapshot);
    }

    /// Invokes a user-defined method.
    pub fn call(&self, method: &str) -> Result<Value> {
        let f = self.model.method(method).ok_or_else(|| {
            DbError::ExecutionError(format!(
                "'{}' has no method '{}'",
                self.model.name(),
                method
            ))
        })?;
        f(self)
    }

    /// Human-readable identifier, from the type's `display` method when it has one.
    pub fn display(&self) -> String {
        if self.model.method(DISPLAY_METHOD).is_some()
            && let Ok(value) = self.call(DISPLAY_METHOD)
        {
            return value.to_string();
        }
        match self.pk {
            Some(pk) => format!("{} object ({})", self.model.name(), pk),
            None => format!("{} object (None)", self.model.name()),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}>", self.model.name(), self.display())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model.qualified_name())
            .field("pk", &self.pk)
            .field("values", &self.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldKind;
    use crate::model::ModelBuilder;
    use serde_json::json;

    fn model() -> Arc<ModelType> {
        ModelBuilder::new("Note")
            .field("body", FieldKind::TextField, json!({"default": "empty"}))
            .method("display", |r| r.get("body"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults_and_row_layout() {
        let mut record = Record::with_defaults(model());
        assert_eq!(record.get("body").unwrap(), Value::from("empty"));
        assert_eq!(record.to_row(), vec![Value::Null, Value::from("empty")]);
        record.set_pk(Some(4));
        assert_eq!(record.get("pk").unwrap(), Value::Integer(4));
        assert_eq!(record.get("id").unwrap(), Value::Integer(4));
    }

    #[test]
    fn test_set_unknown_field() {
        let mut record = Record::with_defaults(model());
        assert!(matches!(
            record.set("title", "x"),
            Err(DbError::FieldNotFound(..))
        ));
    }

    #[test]
    fn test_from_row_and_display() {
        let record =
            Record::from_row(model(), vec![Value::Integer(2), Value::from("hello")]).unwrap();
        assert_eq!(record.pk(), Some(2));
        assert_eq!(record.display(), "hello");
        assert_eq!(record.to_string(), "<Note: hello>");
        assert!(Record::from_row(model(), vec![Value::Null]).is_err());
    }
}
