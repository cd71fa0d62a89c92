use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::core::{DbError, Result};
use crate::model::ModelType;

#[derive(Default)]
struct Module {
    models: BTreeMap<String, Arc<ModelType>>,
    /// Public names of the module, when it keeps an explicit list.
    exports: Option<Vec<String>>,
}

/// Record types visible per module.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<BTreeMap<String, Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives `module` an explicit export list; types exposed later are appended.
    pub fn declare_exports(&self, module: &str, names: Vec<String>) -> Result<()> {
        let mut modules = self.modules.write()?;
        modules.entry(module.to_string()).or_default().exports = Some(names);
        Ok(())
    }

    pub fn exports(&self, module: &str) -> Result<Option<Vec<String>>> {
        Ok(self
            .modules
            .read()?
            .get(module)
            .and_then(|m| m.exports.clone()))
    }

    pub fn contains(&self, module: &str, name: &str) -> bool {
        self.modules
            .read()
            .map(|m| m.get(module).is_some_and(|m| m.models.contains_key(name)))
            .unwrap_or(false)
    }

    /// Makes `models` visible, all or none.
    pub fn expose_all(&self, models: &[Arc<ModelType>]) -> Result<()> {
        let mut modules = self.modules.write()?;
        for (i, model) in models.iter().enumerate() {
            let taken = modules
                .get(model.module())
                .is_some_and(|m| m.models.contains_key(model.name()))
                || models[..i].iter().any(|other| other.same_as(model));
            if taken {
                return Err(DbError::ModelExists(model.qualified_name()));
            }
        }
        for model in models {
            let module = modules.entry(model.module().to_string()).or_default();
            module.models.insert(model.name().to_string(), model.clone());
            if let Some(exports) = &mut module.exports
                && !exports.iter().any(|n| n == model.name())
            {
                exports.push(model.name().to_string());
            }
        }
        Ok(())
    }

    pub fn get(&self, module: &str, name: &str) -> Result<Arc<ModelType>> {
        self.modules
            .read()?
            .get(module)
            .and_then(|m| m.models.get(name))
            .cloned()
            .ok_or_else(|| DbError::ModelNotFound(format!("{}.{}", module, name)))
    }

    /// Resolves a reference target: `"Name"` within `from_module`, or `"module.Name"`.
    pub fn resolve(&self, from_module: &str, target: &str) -> Result<Arc<ModelType>> {
        match target.split_once('.') {
            Some((module, name)) => self.get(module, name),
            None => self.get(from_module, target),
        }
    }

    pub fn models(&self, module: &str) -> Result<Vec<Arc<ModelType>>> {
        Ok(self
            .modules
            .read()?
            .get(module)
            .map(|m| m.models.values().cloned().collect())
            .unwrap_or_default())
    }

    pub fn all_models(&self) -> Result<Vec<Arc<ModelType>>> {
        Ok(self
            .modules
            .read()?
            .values()
            .flat_map(|m| m.models.values().cloned())
            .collect())
    }

    /// The type and foreign-key field that expose `related_name` on `target`.
    pub fn reverse_relation(
        &self,
        target: &ModelType,
        related_name: &str,
    ) -> Result<Option<(Arc<ModelType>, String)>> {
        for model in self.all_models()? {
            for field in &model.meta().fields {
                let Some(relation) = field.relation() else {
                    continue;
                };
                let Ok(points_to) = self.resolve(model.module(), &relation.to) else {
                    continue;
                };
                if !points_to.same_as(target) {
                    continue;
                }
                let accessor = relation
                    .related_name
                    .clone()
                    .unwrap_or_else(|| format!("{}_set", model.name().to_lowercase()));
                if accessor == related_name {
                    return Ok(Some((model.clone(), field.name().to_string())));
                }
            }
        }
        Ok(None)
    }
}
