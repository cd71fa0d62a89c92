use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use crate::admin::ModelAdmin;
use crate::core::{DbError, Result};
use crate::model::builder::validate_identifier;
use crate::model::{MetaBlock, ModelType};

/// Meta keys consumed by [`resolve_settings`].
pub const SETTING_NAMES: &[&str] = &[
    "foreign_key_field_name",
    "related_name",
    "revision_field_name",
    "revision_model_name",
    "unrevised_fields",
    "register_with_admin_site",
    "revised_admin",
];

/// Revision settings of a tracked type.
///
/// Resolved once when the type is declared; the synthesizer then fills in
/// `revised_field_names` and `revision_model` and attaches the result to
/// both the tracked type and its history type.
#[derive(Debug, Clone)]
pub struct RevisedSettings {
    /// Back-reference field on the history type.
    pub foreign_key_field_name: String,
    /// Reverse accessor from a tracked record to its history.
    pub related_name: String,
    /// Revision-number field, on both types.
    pub revision_field_name: String,
    pub revision_model_name: String,
    /// Fields left out of the history type and of change detection.
    pub unrevised_fields: BTreeSet<String>,
    pub register_with_admin_site: bool,
    /// Admin options used when `register_with_admin_site` is set.
    pub revised_admin: ModelAdmin,
    pub revised_field_names: Vec<String>,
    pub revision_model: Option<Arc<ModelType>>,
}

impl RevisedSettings {
    pub fn defaults(model_name: &str) -> Self {
        Self {
            foreign_key_field_name: model_name.to_lowercase(),
            related_name: "revisions".to_string(),
            revision_field_name: "revision".to_string(),
            revision_model_name: format!("{}Revision", model_name),
            unrevised_fields: BTreeSet::new(),
            register_with_admin_site: false,
            revised_admin: ModelAdmin::default(),
            revised_field_names: Vec::new(),
            revision_model: None,
        }
    }

    pub fn revision_model(&self) -> Result<&Arc<ModelType>> {
        self.revision_model.as_ref().ok_or_else(|| {
            DbError::ExecutionError(format!(
                "History type '{}' has not been built",
                self.revision_model_name
            ))
        })
    }

    pub fn is_revised_field(&self, name: &str) -> bool {
        self.revised_field_names.iter().any(|n| n == name)
    }
}

/// Merges the revision keys of `meta` over the defaults for `model_name`.
///
/// Every recognised key is removed from `meta`, so the remaining block only
/// holds options for the record type itself. Falsy values (`null`, `false`,
/// `0`, `""`, `[]`, `{}`) are removed and fall back to the default.
pub fn resolve_settings(model_name: &str, meta: &mut MetaBlock) -> Result<RevisedSettings> {
    let mut settings = RevisedSettings::defaults(model_name);

    for &key in SETTING_NAMES {
        let Some(value) = meta.remove(key) else {
            continue;
        };
        if !is_truthy(&value) {
            continue;
        }
        match key {
            "foreign_key_field_name" => settings.foreign_key_field_name = identifier(key, &value)?,
            "related_name" => settings.related_name = identifier(key, &value)?,
            "revision_field_name" => settings.revision_field_name = identifier(key, &value)?,
            "revision_model_name" => settings.revision_model_name = identifier(key, &value)?,
            "unrevised_fields" => {
                let names = value.as_array().ok_or_else(|| {
                    DbError::InvalidMetaOption("'unrevised_fields' must be a list".into())
                })?;
                settings.unrevised_fields = names
                    .iter()
                    .map(|name| {
                        name.as_str().map(str::to_string).ok_or_else(|| {
                            DbError::InvalidMetaOption(
                                "'unrevised_fields' must contain field names".into(),
                            )
                        })
                    })
                    .collect::<Result<_>>()?;
            }
            "register_with_admin_site" => {
                settings.register_with_admin_site = value.as_bool().ok_or_else(|| {
                    DbError::InvalidMetaOption("'register_with_admin_site' must be a boolean".into())
                })?;
            }
            "revised_admin" => {
                settings.revised_admin = serde_json::from_value(value)
                    .map_err(|e| DbError::InvalidMetaOption(format!("'revised_admin': {}", e)))?;
            }
            _ => {}
        }
    }

    if settings.unrevised_fields.remove(&settings.revision_field_name) {
        warn!(
            model = model_name,
            field = %settings.revision_field_name,
            "the revision field is always revised; ignoring it in unrevised_fields"
        );
    }

    Ok(settings)
}

fn identifier(key: &str, value: &serde_json::Value) -> Result<String> {
    let name = value
        .as_str()
        .ok_or_else(|| DbError::InvalidMetaOption(format!("'{}' must be a string", key)))?;
    validate_identifier(name)?;
    Ok(name.to_string())
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(value: serde_json::Value) -> MetaBlock {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_defaults() {
        let mut meta = MetaBlock::new();
        let settings = resolve_settings("WikiPage", &mut meta).unwrap();
        assert_eq!(settings.foreign_key_field_name, "wikipage");
        assert_eq!(settings.related_name, "revisions");
        assert_eq!(settings.revision_field_name, "revision");
        assert_eq!(settings.revision_model_name, "WikiPageRevision");
        assert!(settings.unrevised_fields.is_empty());
        assert!(!settings.register_with_admin_site);
        assert!(settings.revision_model.is_none());
    }

    #[test]
    fn test_overrides_are_consumed() {
        let mut meta = block(json!({
            "related_name": "history",
            "revision_field_name": "version",
            "unrevised_fields": ["views"],
            "register_with_admin_site": true,
            "revised_admin": {"list_display": ["version"]},
            "ordering": ["-id"]
        }));
        let settings = resolve_settings("Page", &mut meta).unwrap();
        assert_eq!(settings.related_name, "history");
        assert_eq!(settings.revision_field_name, "version");
        assert!(settings.unrevised_fields.contains("views"));
        assert!(settings.register_with_admin_site);
        assert_eq!(settings.revised_admin.list_display, vec!["version".to_string()]);
        assert_eq!(meta.keys().collect::<Vec<_>>(), vec!["ordering"]);
    }

    #[test]
    fn test_falsy_values_fall_back_and_are_removed() {
        let mut meta = block(json!({
            "related_name": "",
            "foreign_key_field_name": null,
            "unrevised_fields": [],
            "register_with_admin_site": false
        }));
        let settings = resolve_settings("Page", &mut meta).unwrap();
        assert_eq!(settings.related_name, "revisions");
        assert_eq!(settings.foreign_key_field_name, "page");
        assert!(meta.is_empty());
    }

    #[test]
    fn test_revision_field_cannot_be_unrevised() {
        let mut meta = block(json!({"unrevised_fields": ["revision", "views"]}));
        let settings = resolve_settings("Page", &mut meta).unwrap();
        assert_eq!(
            settings.unrevised_fields.into_iter().collect::<Vec<_>>(),
            vec!["views".to_string()]
        );
    }

    #[test]
    fn test_bad_shapes() {
        let mut meta = block(json!({"unrevised_fields": "views"}));
        assert!(matches!(
            resolve_settings("Page", &mut meta),
            Err(DbError::InvalidMetaOption(_))
        ));
        let mut meta = block(json!({"revision_model_name": "Page History"}));
        assert!(matches!(
            resolve_settings("Page", &mut meta),
            Err(DbError::InvalidIdentifier(_))
        ));
    }
}
