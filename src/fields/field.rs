use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use super::kind::{BASE_CONSTRUCTOR_ARGS, FieldKind, allowed_arguments};
use crate::core::{Column, DataType, DbError, Result, Value};

/// Constructor arguments of a field, keyed by argument name.
pub type FieldAttrs = BTreeMap<String, serde_json::Value>;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+$")
            .expect("valid email regex");
    static ref SLUG_RE: Regex = Regex::new(r"^[-A-Za-z0-9_]+$").expect("valid slug regex");
    static ref URL_RE: Regex =
        Regex::new(r"^(https?|ftp)://[^\s/$.?#][^\s]*$").expect("valid url regex");
}

/// Target of a `ForeignKey` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Name of the referenced record type.
    pub to: String,
    pub to_field: Option<String>,
    pub related_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: FieldKind,
    options: FieldAttrs,
    null: bool,
    blank: bool,
    unique: bool,
    primary_key: bool,
    default: Option<Value>,
    choices: Option<Vec<Value>>,
    max_length: Option<usize>,
    auto_now: bool,
    auto_now_add: bool,
    relation: Option<Relation>,
}

impl Field {
    /// Builds a field of `kind` from constructor arguments.
    ///
    /// Strict: an argument the kind's constructor does not accept is an
    /// `InvalidFieldArgument` error. Use [`super::filter_attrs`] first when
    /// the arguments come from another field.
    pub fn construct(kind: FieldKind, attrs: FieldAttrs) -> Result<Self> {
        let declared = allowed_arguments(kind.name())?;
        for key in attrs.keys() {
            if !BASE_CONSTRUCTOR_ARGS.contains(&key.as_str()) && !declared.contains(&key.as_str())
            {
                return Err(DbError::InvalidFieldArgument {
                    field_type: kind.name().to_string(),
                    argument: key.clone(),
                });
            }
        }

        let name = match attrs.get("name") {
            Some(serde_json::Value::String(name)) if !name.is_empty() => name.clone(),
            _ => {
                return Err(DbError::InvalidFieldArgument {
                    field_type: kind.name().to_string(),
                    argument: "name".to_string(),
                });
            }
        };

        let default = match attrs.get("default") {
            Some(json) => {
                let value = Value::from_json(json)?;
                if !kind.data_type().is_compatible(&value) {
                    return Err(DbError::TypeMismatch(format!(
                        "Default for field '{}' must be {}, got {}",
                        name,
                        kind.data_type(),
                        value.type_name()
                    )));
                }
                Some(value)
            }
            None => None,
        };

        let choices = match attrs.get("choices") {
            Some(serde_json::Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        // [value, label] pairs keep only the stored value
                        serde_json::Value::Array(pair) if !pair.is_empty() => {
                            Value::from_json(&pair[0])
                        }
                        other => Value::from_json(other),
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(serde_json::Value::Null) | None => None,
            Some(_) => {
                return Err(DbError::TypeMismatch(format!(
                    "Choices for field '{}' must be a list",
                    name
                )));
            }
        };

        let max_length = match attrs.get("max_length") {
            Some(serde_json::Value::Null) | None => None,
            Some(json) => Some(json.as_u64().ok_or_else(|| {
                DbError::TypeMismatch(format!(
                    "max_length for field '{}' must be a positive integer",
                    name
                ))
            })? as usize),
        };

        let relation = if kind == FieldKind::ForeignKey {
            let to = attr_str(&attrs, "to", &name)?.ok_or_else(|| DbError::InvalidFieldArgument {
                field_type: kind.name().to_string(),
                argument: "to".to_string(),
            })?;
            Some(Relation {
                to,
                to_field: attr_str(&attrs, "to_field", &name)?,
                related_name: attr_str(&attrs, "related_name", &name)?,
            })
        } else {
            None
        };

        Ok(Self {
            null: attr_bool(&attrs, "null", &name)?,
            blank: attr_bool(&attrs, "blank", &name)?,
            unique: attr_bool(&attrs, "unique", &name)?,
            primary_key: kind == FieldKind::AutoField || attr_bool(&attrs, "primary_key", &name)?,
            auto_now: attr_bool(&attrs, "auto_now", &name)?,
            auto_now_add: attr_bool(&attrs, "auto_now_add", &name)?,
            name,
            kind,
            default,
            choices,
            max_length,
            relation,
            options: attrs,
        })
    }

    /// Shorthand for a field with nothing but a name.
    pub fn named(kind: FieldKind, name: &str) -> Result<Self> {
        let mut attrs = FieldAttrs::new();
        attrs.insert("name".to_string(), serde_json::Value::from(name));
        Self::construct(kind, attrs)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_nullable(&self) -> bool {
        self.null
    }

    pub fn is_blank_allowed(&self) -> bool {
        self.blank
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }

    pub fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    /// The field's internal attribute dictionary.
    ///
    /// Uniqueness, choices and the reverse accessor name are private state
    /// here, so they are not part of the constructor vocabulary a copy is
    /// built from.
    pub fn attributes(&self) -> FieldAttrs {
        let mut attrs = FieldAttrs::new();
        for (key, value) in &self.options {
            let key = match key.as_str() {
                "unique" => "_unique".to_string(),
                "choices" => "_choices".to_string(),
                "related_name" => "_related_name".to_string(),
                _ => key.clone(),
            };
            attrs.insert(key, value.clone());
        }
        attrs.insert("name".to_string(), serde_json::Value::from(self.name.clone()));
        if self.primary_key {
            attrs.insert("primary_key".to_string(), serde_json::Value::Bool(true));
        }
        attrs
    }

    /// Storage column for this field. Foreign-key targets are resolved by the
    /// model builder, which knows the referenced table.
    pub fn column(&self) -> Column {
        let mut column = Column::new(self.name.clone(), self.kind.data_type());
        column.nullable = self.null;
        if self.unique {
            column = column.unique();
        }
        if self.primary_key {
            column = column.primary_key();
        }
        column
    }

    /// Applies `auto_now`/`auto_now_add` before a record is written.
    pub fn pre_save(&self, value: &mut Value, adding: bool) {
        if !(self.auto_now || (self.auto_now_add && adding)) {
            return;
        }
        let now = Utc::now();
        *value = match self.kind {
            FieldKind::DateField => Value::Text(now.format("%Y-%m-%d").to_string()),
            _ => Value::Text(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        };
    }

    /// Field-level validation on top of the column's type and NULL checks.
    pub fn clean(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        if let Some(choices) = &self.choices
            && !choices.contains(value)
        {
            return Err(self.invalid(value, "is not a valid choice"));
        }

        if let (Some(max), Value::Text(text)) = (self.max_length, value)
            && text.chars().count() > max
        {
            return Err(self.invalid(value, &format!("is longer than {} characters", max)));
        }

        if let Value::Text(text) = value
            && text.is_empty()
            && !self.blank
            && self.kind.data_type() == DataType::Text
        {
            return Err(self.invalid(value, "may not be blank"));
        }

        match (self.kind, value) {
            (FieldKind::PositiveIntegerField, Value::Integer(i)) if *i < 0 => {
                Err(self.invalid(value, "must be positive"))
            }
            (FieldKind::SmallIntegerField, Value::Integer(i))
                if *i < i16::MIN as i64 || *i > i16::MAX as i64 =>
            {
                Err(self.invalid(value, "is out of range"))
            }
            (FieldKind::EmailField, Value::Text(s)) if !EMAIL_RE.is_match(s) => {
                Err(self.invalid(value, "is not a valid email address"))
            }
            (FieldKind::SlugField, Value::Text(s)) if !SLUG_RE.is_match(s) => {
                Err(self.invalid(value, "is not a valid slug"))
            }
            (FieldKind::URLField, Value::Text(s)) if !URL_RE.is_match(s) => {
                Err(self.invalid(value, "is not a valid URL"))
            }
            (FieldKind::DateField, Value::Text(s))
                if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() =>
            {
                Err(self.invalid(value, "is not a valid date"))
            }
            (FieldKind::DateTimeField, Value::Text(s))
                if DateTime::parse_from_rfc3339(s).is_err()
                    && NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_err() =>
            {
                Err(self.invalid(value, "is not a valid date/time"))
            }
            _ => Ok(()),
        }
    }

    fn invalid(&self, value: &Value, reason: &str) -> DbError {
        DbError::ConstraintViolation(format!(
            "Value '{}' for field '{}' {}",
            value, self.name, reason
        ))
    }
}

fn attr_bool(attrs: &FieldAttrs, key: &str, field: &str) -> Result<bool> {
    match attrs.get(key) {
        None | Some(serde_json::Value::Null) => Ok(false),
        Some(serde_json::Value::Bool(b)) => Ok(*b),
        Some(_) => Err(DbError::TypeMismatch(format!(
            "Argument '{}' of field '{}' must be a boolean",
            key, field
        ))),
    }
}

fn attr_str(attrs: &FieldAttrs, key: &str, field: &str) -> Result<Option<String>> {
    match attrs.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DbError::TypeMismatch(format!(
            "Argument '{}' of field '{}' must be a string",
            key, field
        ))),
    }
}
