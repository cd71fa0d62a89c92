use std::fmt;
use std::sync::{Arc, OnceLock};

use super::behavior::ModelBehavior;
use super::methods::{Method, MethodTable};
use crate::core::{DbError, Result};
use crate::fields::Field;
use crate::revised::RevisedSettings;

/// One entry of a default ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    /// Parses `"name"` / `"-name"`.
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                descending: true,
            },
            None => Self {
                field: spec.to_string(),
                descending: false,
            },
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

/// Per-type metadata.
pub struct ModelMeta {
    pub db_table: String,
    pub verbose_name: String,
    pub fields: Vec<Field>,
    pub pk_name: String,
    pub ordering: Vec<OrderBy>,
    pub unique_together: Vec<Vec<String>>,
    revised: OnceLock<Arc<RevisedSettings>>,
}

impl ModelMeta {
    pub(crate) fn new(
        db_table: String,
        verbose_name: String,
        fields: Vec<Field>,
        pk_name: String,
        ordering: Vec<OrderBy>,
        unique_together: Vec<Vec<String>>,
    ) -> Self {
        Self {
            db_table,
            verbose_name,
            fields,
            pk_name,
            ordering,
            unique_together,
            revised: OnceLock::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    /// Revision settings, present on tracked types and their history types.
    pub fn revised_settings(&self) -> Option<&Arc<RevisedSettings>> {
        self.revised.get()
    }

    pub(crate) fn attach_revised_settings(&self, settings: Arc<RevisedSettings>) -> Result<()> {
        self.revised.set(settings).map_err(|_| {
            DbError::ExecutionError(format!(
                "Revision settings already attached to '{}'",
                self.db_table
            ))
        })
    }
}

impl fmt::Debug for ModelMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelMeta")
            .field("db_table", &self.db_table)
            .field("fields", &self.field_names())
            .field("pk_name", &self.pk_name)
            .field("ordering", &self.ordering)
            .field("unique_together", &self.unique_together)
            .field("revised", &self.revised.get().is_some())
            .finish()
    }
}

/// A finalized record type. Immutable once built.
pub struct ModelType {
    name: String,
    module: String,
    meta: ModelMeta,
    methods: MethodTable,
    behavior: Arc<dyn ModelBehavior>,
}

impl ModelType {
    pub(crate) fn new(
        name: String,
        module: String,
        meta: ModelMeta,
        methods: MethodTable,
        behavior: Arc<dyn ModelBehavior>,
    ) -> Self {
        Self {
            name,
            module,
            meta,
            methods,
            behavior,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// `module.Name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn behavior(&self) -> &Arc<dyn ModelBehavior> {
        &self.behavior
    }

    pub fn is_revised(&self) -> bool {
        self.meta
            .revised_settings()
            .is_some_and(|s| s.revision_model_name != self.name)
    }

    pub fn same_as(&self, other: &ModelType) -> bool {
        self.module == other.module && self.name == other.name
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("meta", &self.meta)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}
