use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use super::behavior::{ModelBehavior, PlainBehavior};
use super::meta::{ModelMeta, ModelType, OrderBy};
use super::methods::{Method, MethodTable, RESERVED_MEMBERS};
use super::Record;
use crate::core::{DbError, Result, Value};
use crate::fields::{Field, FieldAttrs, FieldKind};

/// Nested configuration block of a type declaration.
pub type MetaBlock = serde_json::Map<String, serde_json::Value>;

/// Module used when a declaration does not name one.
pub const DEFAULT_MODULE: &str = "app";

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex");
}

pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    if IDENT_RE.is_match(name) {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

enum PendingField {
    Declared {
        name: String,
        type_name: String,
        options: serde_json::Value,
    },
    Built(Field),
}

/// Assembles a record type. Nothing is validated until [`ModelBuilder::build`],
/// which either yields a complete type or an error.
pub struct ModelBuilder {
    name: String,
    module: Option<String>,
    fields: Vec<PendingField>,
    meta: MetaBlock,
    methods: MethodTable,
    behavior: Arc<dyn ModelBehavior>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: None,
            fields: Vec::new(),
            meta: MetaBlock::new(),
            methods: MethodTable::new(),
            behavior: Arc::new(PlainBehavior),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub(crate) fn module_or(mut self, module: &str) -> Self {
        if self.module.is_none() {
            self.module = Some(module.to_string());
        }
        self
    }

    pub fn module_name(&self) -> &str {
        self.module.as_deref().unwrap_or(DEFAULT_MODULE)
    }

    /// Declares a field; `options` is a JSON object of constructor arguments.
    pub fn field(self, name: impl Into<String>, kind: FieldKind, options: serde_json::Value) -> Self {
        self.field_of_type(name, kind.name(), options)
    }

    /// Declares a field by type name, resolved against the field catalog at build time.
    pub fn field_of_type(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        options: serde_json::Value,
    ) -> Self {
        self.fields.push(PendingField::Declared {
            name: name.into(),
            type_name: type_name.into(),
            options,
        });
        self
    }

    pub fn add_field(mut self, field: Field) -> Self {
        self.fields.push(PendingField::Built(field));
        self
    }

    pub fn meta_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn meta(mut self, meta: MetaBlock) -> Self {
        self.meta.extend(meta);
        self
    }

    pub(crate) fn meta_mut(&mut self) -> &mut MetaBlock {
        &mut self.meta
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub(crate) fn shared_method(mut self, name: impl Into<String>, method: Method) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub(crate) fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn behavior(mut self, behavior: Arc<dyn ModelBehavior>) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn build(self) -> Result<Arc<ModelType>> {
        validate_identifier(&self.name)?;
        let module = self.module.unwrap_or_else(|| DEFAULT_MODULE.to_string());
        validate_identifier(&module)?;

        for name in self.methods.keys() {
            if RESERVED_MEMBERS.contains(&name.as_str()) {
                return Err(DbError::InvalidIdentifier(format!(
                    "{}.{} is reserved",
                    self.name, name
                )));
            }
        }

        let mut fields = Vec::with_capacity(self.fields.len() + 1);
        let mut seen = HashSet::new();
        for pending in self.fields {
            let field = match pending {
                PendingField::Declared {
                    name,
                    type_name,
                    options,
                } => {
                    let kind = FieldKind::from_name(&type_name)?;
                    let mut attrs: FieldAttrs = match options {
                        serde_json::Value::Null => FieldAttrs::new(),
                        serde_json::Value::Object(map) => map.into_iter().collect(),
                        _ => {
                            return Err(DbError::InvalidFieldArgument {
                                field_type: type_name,
                                argument: name,
                            });
                        }
                    };
                    attrs.insert("name".to_string(), serde_json::Value::from(name));
                    Field::construct(kind, attrs)?
                }
                PendingField::Built(field) => field,
            };
            validate_identifier(field.name())?;
            if !seen.insert(field.name().to_string()) {
                return Err(DbError::DuplicateField(field.name().to_string(), self.name));
            }
            fields.push(field);
        }

        let pk_names: Vec<String> = fields
            .iter()
            .filter(|f| f.is_primary_key())
            .map(|f| f.name().to_string())
            .collect();
        let pk_name = match pk_names.as_slice() {
            [] => {
                if seen.contains("id") {
                    return Err(DbError::DuplicateField("id".to_string(), self.name));
                }
                fields.insert(0, Field::named(FieldKind::AutoField, "id")?);
                seen.insert("id".to_string());
                "id".to_string()
            }
            [pk] => pk.clone(),
            _ => {
                return Err(DbError::ExecutionError(format!(
                    "Model '{}' declares more than one primary key",
                    self.name
                )));
            }
        };

        let mut db_table = format!("{}_{}", module, self.name.to_lowercase());
        let mut verbose_name = self.name.to_lowercase();
        let mut ordering = Vec::new();
        let mut unique_together = Vec::new();

        for (key, value) in self.meta {
            match key.as_str() {
                "db_table" => db_table = meta_string(&key, &value)?,
                "verbose_name" => verbose_name = meta_string(&key, &value)?,
                "ordering" => {
                    ordering = meta_string_list(&key, &value)?
                        .iter()
                        .map(|spec| OrderBy::parse(spec))
                        .collect()
                }
                "unique_together" => unique_together = meta_unique_together(&value)?,
                _ => {
                    return Err(DbError::InvalidMetaOption(format!(
                        "'{}' is not a valid option for model '{}'",
                        key, self.name
                    )));
                }
            }
        }

        for order in &mut ordering {
            if order.field == "pk" {
                order.field = pk_name.clone();
            }
            if !seen.contains(&order.field) && order.field != pk_name {
                return Err(DbError::FieldNotFound(order.field.clone(), self.name.clone()));
            }
        }
        for set in &unique_together {
            for name in set {
                if !seen.contains(name) && *name != pk_name {
                    return Err(DbError::FieldNotFound(name.clone(), self.name.clone()));
                }
            }
        }

        let meta = ModelMeta::new(
            db_table,
            verbose_name,
            fields,
            pk_name,
            ordering,
            unique_together,
        );
        Ok(Arc::new(ModelType::new(
            self.name,
            module,
            meta,
            self.methods,
            self.behavior,
        )))
    }
}

fn meta_string(key: &str, value: &serde_json::Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DbError::InvalidMetaOption(format!("'{}' must be a string", key)))
}

fn meta_string_list(key: &str, value: &serde_json::Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| DbError::InvalidMetaOption(format!("'{}' must be a list", key)))?;
    items.iter().map(|item| meta_string(key, item)).collect()
}

/// Accepts `[["a", "b"], ...]` or a single `["a", "b"]` set.
fn meta_unique_together(value: &serde_json::Value) -> Result<Vec<Vec<String>>> {
    let items = value
        .as_array()
        .ok_or_else(|| DbError::InvalidMetaOption("'unique_together' must be a list".into()))?;
    if items.iter().all(|item| item.is_string()) {
        return Ok(vec![meta_string_list("unique_together", value)?]);
    }
    items
        .iter()
        .map(|set| meta_string_list("unique_together", set))
        .collect()
}
