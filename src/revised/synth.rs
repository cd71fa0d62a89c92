use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use super::history::WriteOnceBehavior;
use super::settings::resolve_settings;
use super::tracking::{RevisedBehavior, SNAPSHOT_DISPATCH_UID, SnapshotRecorder};
use crate::core::{DbError, Result, Value};
use crate::facade::Database;
use crate::fields::{Field, FieldAttrs, FieldKind, filter_attrs};
use crate::model::{MetaBlock, ModelBuilder, ModelType, Record};

/// Declaration of a record type with revision history.
///
/// Takes the same declarations as [`ModelBuilder`], plus the revision keys
/// of the meta block (see [`super::SETTING_NAMES`]). [`Self::register`]
/// builds the tracked type and its history type and registers both, or
/// neither.
pub struct RevisedModelBuilder {
    inner: ModelBuilder,
}

impl From<ModelBuilder> for RevisedModelBuilder {
    fn from(inner: ModelBuilder) -> Self {
        Self { inner }
    }
}

impl RevisedModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: ModelBuilder::new(name),
        }
    }

    pub fn module(self, module: impl Into<String>) -> Self {
        Self {
            inner: self.inner.module(module),
        }
    }

    pub fn field(self, name: impl Into<String>, kind: FieldKind, options: serde_json::Value) -> Self {
        Self {
            inner: self.inner.field(name, kind, options),
        }
    }

    pub fn field_of_type(
        self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        options: serde_json::Value,
    ) -> Self {
        Self {
            inner: self.inner.field_of_type(name, type_name, options),
        }
    }

    pub fn meta_option(self, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            inner: self.inner.meta_option(key, value),
        }
    }

    pub fn meta(self, meta: MetaBlock) -> Self {
        Self {
            inner: self.inner.meta(meta),
        }
    }

    pub fn method<F>(self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            inner: self.inner.method(name, method),
        }
    }

    /// Builds the tracked type and its history type and registers both.
    /// Returns the tracked type.
    pub fn register(self, db: &Database) -> Result<Arc<ModelType>> {
        let mut builder = self.inner.module_or(&db.config().default_module);

        let name = builder.name().to_string();
        let mut settings = resolve_settings(&name, builder.meta_mut())?;

        let tracked = builder
            .add_field(Field::construct(
                FieldKind::PositiveIntegerField,
                attrs(json!({"name": settings.revision_field_name, "default": 1})),
            )?)
            .behavior(Arc::new(RevisedBehavior))
            .build()?;

        for name in &settings.unrevised_fields {
            if !tracked.meta().has_field(name) {
                return Err(DbError::FieldNotFound(name.clone(), tracked.name().to_string()));
            }
        }

        // Copy every revised field onto the history type
        let mut history_fields = Vec::new();
        let mut revised_field_names = Vec::new();
        for field in &tracked.meta().fields {
            if field.is_primary_key() || settings.unrevised_fields.contains(field.name()) {
                continue;
            }
            let kind = FieldKind::from_name(field.type_name())?;
            let copy = Field::construct(kind, filter_attrs(&field.attributes(), field.type_name())?)?;
            debug!(model = %tracked.name(), field = %field.name(), kind = %kind, "copied field to history type");
            revised_field_names.push(field.name().to_string());
            history_fields.push(copy);
        }

        if history_fields
            .iter()
            .any(|f| f.name() == settings.foreign_key_field_name)
        {
            return Err(DbError::DuplicateField(
                settings.foreign_key_field_name.clone(),
                settings.revision_model_name.clone(),
            ));
        }
        // The history type's revision field has no default
        history_fields.retain(|f| f.name() != settings.revision_field_name);
        history_fields.push(Field::construct(
            FieldKind::ForeignKey,
            attrs(json!({
                "name": settings.foreign_key_field_name,
                "to": tracked.qualified_name(),
                "related_name": settings.related_name,
            })),
        )?);
        history_fields.push(Field::construct(
            FieldKind::PositiveIntegerField,
            attrs(json!({"name": settings.revision_field_name})),
        )?);

        let mut history_builder = ModelBuilder::new(settings.revision_model_name.clone())
            .module(tracked.module())
            .meta_option(
                "db_table",
                json!(format!(
                    "{}{}",
                    tracked.meta().db_table,
                    db.config().revision_table_suffix
                )),
            )
            .meta_option("ordering", json!([format!("-{}", settings.revision_field_name)]))
            .meta_option(
                "unique_together",
                json!([[settings.foreign_key_field_name, settings.revision_field_name]]),
            )
            .behavior(Arc::new(WriteOnceBehavior));
        for field in history_fields {
            history_builder = history_builder.add_field(field);
        }
        for (name, method) in tracked.methods() {
            if !history_builder.has_method(name) {
                history_builder = history_builder.shared_method(name.clone(), method.clone());
            }
        }
        let history = history_builder.build()?;

        if settings.register_with_admin_site {
            settings.revised_admin.validate(&history)?;
        }

        settings.revised_field_names = revised_field_names;
        settings.revision_model = Some(history.clone());
        let settings = Arc::new(settings);
        tracked.meta().attach_revised_settings(settings.clone())?;
        history.meta().attach_revised_settings(settings.clone())?;

        db.register_all(&[tracked.clone(), history.clone()])?;
        db.signals()
            .connect(SNAPSHOT_DISPATCH_UID, Arc::new(SnapshotRecorder));
        if settings.register_with_admin_site {
            db.admin()
                .register(history.clone(), settings.revised_admin.clone())?;
        }

        info!(
            model = %tracked.qualified_name(),
            history = %history.qualified_name(),
            table = %history.meta().db_table,
            fields = ?settings.revised_field_names,
            "synthesized history type"
        );
        Ok(tracked)
    }
}

fn attrs(value: serde_json::Value) -> FieldAttrs {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => FieldAttrs::new(),
    }
}
