//! Administrative interface registry.
//!
//! Holds which record types are exposed to the admin UI and with which
//! presentation options. Rendering the UI is not part of this crate.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::{DbError, Result};
use crate::model::ModelType;

/// Presentation options for one registered type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelAdmin {
    pub list_display: Vec<String>,
    pub list_filter: Vec<String>,
    pub search_fields: Vec<String>,
    pub ordering: Vec<String>,
    pub readonly_fields: Vec<String>,
}

impl ModelAdmin {
    /// Every referenced field must exist on `model`.
    pub fn validate(&self, model: &ModelType) -> Result<()> {
        let referenced = self
            .list_display
            .iter()
            .chain(&self.list_filter)
            .chain(&self.search_fields)
            .chain(&self.readonly_fields)
            .map(String::as_str)
            .chain(self.ordering.iter().map(|o| o.strip_prefix('-').unwrap_or(o)));
        for name in referenced {
            if name != "pk" && !model.meta().has_field(name) {
                return Err(DbError::FieldNotFound(
                    name.to_string(),
                    model.name().to_string(),
                ));
            }
        }
        Ok(())
    }
}

pub struct AdminSite {
    name: String,
    registry: RwLock<BTreeMap<String, (Arc<ModelType>, ModelAdmin)>>,
}

impl AdminSite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&self, model: Arc<ModelType>, admin: ModelAdmin) -> Result<()> {
        admin.validate(&model)?;
        let key = model.qualified_name();
        let mut registry = self.registry.write()?;
        if registry.contains_key(&key) {
            warn!("{}: model {} is already registered", self.name, key);
            return Err(DbError::AlreadyRegistered(key));
        }
        info!("{}: registered {}", self.name, key);
        registry.insert(key, (model, admin));
        Ok(())
    }

    pub fn unregister(&self, model: &ModelType) -> Result<()> {
        let key = model.qualified_name();
        match self.registry.write()?.remove(&key) {
            Some(_) => Ok(()),
            None => Err(DbError::ModelNotFound(key)),
        }
    }

    pub fn is_registered(&self, model: &ModelType) -> bool {
        self.registry
            .read()
            .map(|r| r.contains_key(&model.qualified_name()))
            .unwrap_or(false)
    }

    pub fn model_admin(&self, model: &ModelType) -> Option<ModelAdmin> {
        self.registry
            .read()
            .ok()
            .and_then(|r| r.get(&model.qualified_name()).map(|(_, admin)| admin.clone()))
    }

    /// Qualified names of the registered types, sorted.
    pub fn registered(&self) -> Vec<String> {
        self.registry
            .read()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldKind;
    use crate::model::ModelBuilder;
    use serde_json::json;

    fn model() -> Arc<ModelType> {
        ModelBuilder::new("Page")
            .field("title", FieldKind::CharField, json!({"max_length": 40}))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_once() {
        let site = AdminSite::new("admin");
        let page = model();
        site.register(page.clone(), ModelAdmin::default()).unwrap();
        assert!(site.is_registered(&page));
        assert!(matches!(
            site.register(page.clone(), ModelAdmin::default()),
            Err(DbError::AlreadyRegistered(_))
        ));
        assert_eq!(site.registered(), vec!["app.Page".to_string()]);
        site.unregister(&page).unwrap();
        assert!(!site.is_registered(&page));
    }

    #[test]
    fn test_options_reference_existing_fields() {
        let site = AdminSite::new("admin");
        let admin: ModelAdmin =
            serde_json::from_value(json!({"list_display": ["title"], "ordering": ["-id"]})).unwrap();
        site.register(model(), admin.clone()).unwrap();
        assert_eq!(site.model_admin(&model()), Some(admin));

        let bad = ModelAdmin {
            search_fields: vec!["body".into()],
            ..ModelAdmin::default()
        };
        let other = AdminSite::new("other");
        assert!(matches!(
            other.register(model(), bad),
            Err(DbError::FieldNotFound(..))
        ));
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let parsed: std::result::Result<ModelAdmin, _> =
            serde_json::from_value(json!({"list_per_page": 10}));
        assert!(parsed.is_err());
    }
}
