use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, info};

use super::registry::ModuleRegistry;
use super::signals::Signals;
use crate::admin::AdminSite;
use crate::config::DatabaseConfig;
use crate::core::{Column, DbError, Result, Row, Value};
use crate::model::{ModelBuilder, ModelType, Record};
use crate::storage::{InMemoryStorage, StorageEngine, TableSchema};

/// Record store, type registry and lifecycle dispatcher.
///
/// All persistence of records goes through here: [`Database::save`],
/// [`Database::delete`] and [`Database::revert_to_revision`] dispatch to the
/// record type's behavior, which in turn uses the plain primitives
/// [`Database::save_base`] and [`Database::delete_base`].
pub struct Database {
    config: DatabaseConfig,
    storage: Arc<dyn StorageEngine>,
    modules: ModuleRegistry,
    admin: AdminSite,
    signals: Signals,
}

impl Database {
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        let storage = InMemoryStorage::new().with_foreign_keys(config.enforce_foreign_keys);
        Self::with_storage(config, Arc::new(storage))
    }

    pub fn with_storage(config: DatabaseConfig, storage: Arc<dyn StorageEngine>) -> Self {
        Self {
            config,
            storage,
            modules: ModuleRegistry::new(),
            admin: AdminSite::new("admin"),
            signals: Signals::new(),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageEngine> {
        &self.storage
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn admin(&self) -> &AdminSite {
        &self.admin
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    // ========================================================================
    // Type registration
    // ========================================================================

    /// Builds and registers a plain record type.
    pub fn define(&self, builder: ModelBuilder) -> Result<Arc<ModelType>> {
        let model = builder.module_or(&self.config.default_module).build()?;
        self.register(model.clone())?;
        Ok(model)
    }

    pub fn register(&self, model: Arc<ModelType>) -> Result<()> {
        self.register_all(&[model])
    }

    /// Creates storage for `models` and publishes them in their modules.
    /// Every check runs before the first side effect.
    pub fn register_all(&self, models: &[Arc<ModelType>]) -> Result<()> {
        let mut schemas = Vec::with_capacity(models.len());
        for (i, model) in models.iter().enumerate() {
            if self.modules.contains(model.module(), model.name())
                || models[..i].iter().any(|other| other.same_as(model))
            {
                return Err(DbError::ModelExists(model.qualified_name()));
            }
            let table = &model.meta().db_table;
            if self.storage.table_exists(table)
                || models[..i].iter().any(|other| &other.meta().db_table == table)
            {
                return Err(DbError::TableExists(table.clone()));
            }
            schemas.push(self.table_schema(model, models)?);
        }

        for schema in schemas {
            self.storage.create_table(schema)?;
        }
        self.modules.expose_all(models)?;

        for model in models {
            info!(
                database = %self.config.name,
                model = %model.qualified_name(),
                table = %model.meta().db_table,
                "registered model"
            );
        }
        Ok(())
    }

    pub fn model(&self, module: &str, name: &str) -> Result<Arc<ModelType>> {
        self.modules.get(module, name)
    }

    fn table_schema(&self, model: &ModelType, batch: &[Arc<ModelType>]) -> Result<TableSchema> {
        let mut columns: Vec<Column> = Vec::with_capacity(model.meta().fields.len());
        let mut indexes = Vec::new();
        for field in &model.meta().fields {
            let mut column = field.column();
            if let Some(relation) = field.relation() {
                let target = self.resolve_target(model.module(), &relation.to, batch)?;
                let to_field = relation
                    .to_field
                    .clone()
                    .unwrap_or_else(|| target.meta().pk_name.clone());
                if !target.meta().has_field(&to_field) {
                    return Err(DbError::FieldNotFound(to_field, target.name().to_string()));
                }
                column = column.references(target.meta().db_table.clone(), to_field);
                indexes.push(field.name().to_string());
            }
            columns.push(column);
        }

        let mut schema = TableSchema::new(model.meta().db_table.clone(), columns)
            .with_unique_together(model.meta().unique_together.clone());
        schema.indexes = indexes;
        Ok(schema)
    }

    fn resolve_target(
        &self,
        from_module: &str,
        target: &str,
        batch: &[Arc<ModelType>],
    ) -> Result<Arc<ModelType>> {
        let (module, name) = target.split_once('.').unwrap_or((from_module, target));
        if let Some(model) = batch
            .iter()
            .find(|m| m.module() == module && m.name() == name)
        {
            return Ok(model.clone());
        }
        self.modules.get(module, name)
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Constructs a record in memory from defaults plus `values`.
    pub fn instantiate<I, K, V>(&self, model: &Arc<ModelType>, values: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Record::with_defaults(model.clone());
        for (name, value) in values {
            record.set(name.as_ref(), value)?;
        }
        self.signals.send_post_init(&mut record);
        Ok(record)
    }

    pub fn save(&self, record: &mut Record) -> Result<()> {
        let behavior = record.model().behavior().clone();
        behavior.save(self, record)
    }

    pub fn delete(&self, record: &mut Record, deep: bool) -> Result<()> {
        let behavior = record.model().behavior().clone();
        behavior.delete(self, record, deep)
    }

    pub fn revert_to_revision(&self, record: &mut Record, revision: i64) -> Result<()> {
        let behavior = record.model().behavior().clone();
        behavior.revert_to_revision(self, record, revision)
    }

    /// Writes the record as-is: insert when it has no key, update otherwise.
    pub fn save_base(&self, record: &mut Record) -> Result<()> {
        let model = record.model().clone();
        let adding = record.pk().is_none();

        for field in model.meta().fields.iter().filter(|f| !f.is_primary_key()) {
            if let Some(value) = record.values_mut().get_mut(field.name()) {
                field.pre_save(value, adding);
                field.clean(value)?;
            }
        }

        let table = &model.meta().db_table;
        let row = record.to_row();
        let created = match record.pk() {
            Some(pk) => {
                if self.storage.update_row(table, pk, row.clone())? {
                    false
                } else {
                    self.storage.insert_row(table, row)?;
                    true
                }
            }
            None => {
                let pk = self.storage.insert_row(table, row)?;
                record.set_pk(Some(pk));
                true
            }
        };

        debug!(model = %model.qualified_name(), pk = ?record.pk(), created, "saved record");
        self.signals.send_post_save(record, created);
        Ok(())
    }

    /// Removes the stored row and clears the record's key, so saving it
    /// again inserts a new row.
    pub fn delete_base(&self, record: &mut Record) -> Result<()> {
        let pk = record.pk().ok_or_else(|| {
            DbError::ExecutionError(format!(
                "{} can't be deleted because its primary key is not set",
                record.display()
            ))
        })?;
        let model = record.model().clone();
        self.storage.delete_row(&model.meta().db_table, pk)?;
        record.set_pk(None);
        debug!(model = %model.qualified_name(), pk, "deleted record");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, model: &Arc<ModelType>, pk: i64) -> Result<Option<Record>> {
        self.storage
            .get_row(&model.meta().db_table, pk)?
            .map(|row| self.load(model, row))
            .transpose()
    }

    /// Records whose `field` equals `value`, in the type's default order.
    pub fn filter(
        &self,
        model: &Arc<ModelType>,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<Record>> {
        let column = if field == "pk" {
            model.meta().pk_name.as_str()
        } else {
            field
        };
        if !model.meta().has_field(column) {
            return Err(DbError::FieldNotFound(field.to_string(), model.name().to_string()));
        }
        let rows = self
            .storage
            .scan_eq(&model.meta().db_table, column, &value.into())?;
        self.load_ordered(model, rows)
    }

    pub fn all(&self, model: &Arc<ModelType>) -> Result<Vec<Record>> {
        let rows = self.storage.scan_table(&model.meta().db_table)?;
        self.load_ordered(model, rows)
    }

    pub fn count(&self, model: &ModelType) -> Result<usize> {
        self.storage.row_count(&model.meta().db_table)
    }

    /// Reverse accessor: records of the type whose foreign key declared
    /// `related_name` and points at `record`.
    pub fn related(&self, record: &Record, related_name: &str) -> Result<Vec<Record>> {
        let (model, fk_field) = self
            .modules
            .reverse_relation(record.model(), related_name)?
            .ok_or_else(|| {
                DbError::FieldNotFound(related_name.to_string(), record.model().name().to_string())
            })?;
        match record.pk() {
            Some(pk) => self.filter(&model, &fk_field, Value::Integer(pk)),
            None => Ok(Vec::new()),
        }
    }

    fn load(&self, model: &Arc<ModelType>, row: Row) -> Result<Record> {
        let mut record = Record::from_row(model.clone(), row)?;
        self.signals.send_post_init(&mut record);
        Ok(record)
    }

    fn load_ordered(&self, model: &Arc<ModelType>, rows: Vec<Row>) -> Result<Vec<Record>> {
        let mut records = rows
            .into_iter()
            .map(|row| self.load(model, row))
            .collect::<Result<Vec<_>>>()?;

        let ordering = &model.meta().ordering;
        if !ordering.is_empty() {
            records.sort_by(|a, b| {
                for order in ordering {
                    let (Ok(left), Ok(right)) = (a.get(&order.field), b.get(&order.field)) else {
                        continue;
                    };
                    let cmp = left.compare(&right).unwrap_or(Ordering::Equal);
                    let cmp = if order.descending { cmp.reverse() } else { cmp };
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                Ordering::Equal
            });
        }
        Ok(records)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
