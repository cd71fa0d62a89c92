use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::builder::{MetaBlock, ModelBuilder};
use super::meta::ModelType;
use crate::core::Result;
use crate::facade::Database;
use crate::revised::RevisedModelBuilder;

/// A module of record-type declarations in JSON form.
///
/// ```json
/// {
///   "module": "wiki",
///   "exports": ["Page"],
///   "models": [
///     {"name": "Page", "revised": true,
///      "fields": [{"name": "title", "type": "CharField", "options": {"max_length": 80}}],
///      "meta": {"unrevised_fields": []}}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaSpec {
    #[serde(default)]
    pub module: Option<String>,
    /// Export list of the module; types defined here are appended to it.
    #[serde(default)]
    pub exports: Option<Vec<String>>,
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSpec {
    pub name: String,
    #[serde(default)]
    pub revised: bool,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub meta: MetaBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "empty_options")]
    pub options: serde_json::Value,
}

fn empty_options() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl SchemaSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defines every model in declaration order. Returns the declared types;
    /// history types are reachable through their settings.
    pub fn define_all(&self, db: &Database) -> Result<Vec<Arc<ModelType>>> {
        let module = self
            .module
            .clone()
            .unwrap_or_else(|| db.config().default_module.clone());
        if let Some(exports) = &self.exports {
            db.modules().declare_exports(&module, exports.clone())?;
        }

        self.models
            .iter()
            .map(|model| model.define(db, &module))
            .collect()
    }
}

impl ModelSpec {
    pub fn builder(&self, module: &str) -> ModelBuilder {
        let mut builder = ModelBuilder::new(self.name.clone())
            .module(module)
            .meta(self.meta.clone());
        for field in &self.fields {
            builder = builder.field_of_type(field.name.clone(), field.type_name.clone(), field.options.clone());
        }
        builder
    }

    pub fn define(&self, db: &Database, module: &str) -> Result<Arc<ModelType>> {
        let builder = self.builder(module);
        if self.revised {
            RevisedModelBuilder::from(builder).register(db)
        } else {
            db.define(builder)
        }
    }
}
