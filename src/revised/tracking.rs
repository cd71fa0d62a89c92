use std::sync::Arc;

use tracing::{debug, info};

use super::settings::RevisedSettings;
use crate::core::{DbError, Result, Value};
use crate::facade::{Database, LifecycleHook};
use crate::model::{FieldValues, ModelBehavior, Record};

/// Dispatch uid of [`SnapshotRecorder`]; connecting it twice is a no-op.
pub const SNAPSHOT_DISPATCH_UID: &str = "revised.record_model_values";

/// Snapshots tracked records after they are constructed, loaded or saved.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotRecorder;

impl LifecycleHook for SnapshotRecorder {
    fn post_init(&self, record: &mut Record) {
        record_values(record);
    }

    fn post_save(&self, record: &mut Record, _created: bool) {
        record_values(record);
    }
}

fn tracked_settings(record: &Record) -> Option<Arc<RevisedSettings>> {
    if !record.model().is_revised() {
        return None;
    }
    record.model().meta().revised_settings().cloned()
}

/// Copies the current values of the revised fields into the record's snapshot.
/// Records of untracked types are left alone.
pub fn record_values(record: &mut Record) {
    let Some(settings) = tracked_settings(record) else {
        return;
    };
    let snapshot: FieldValues = settings
        .revised_field_names
        .iter()
        .map(|name| {
            let value = record.values().get(name).cloned().unwrap_or(Value::Null);
            (name.clone(), value)
        })
        .collect();
    debug!(model = %record.model().name(), pk = ?record.pk(), "recorded snapshot");
    record.set_snapshot(snapshot);
}

/// True when a revised field differs from the snapshot. A record without a
/// snapshot never counts as changed.
pub fn has_changed(record: &Record) -> bool {
    let (Some(settings), Some(snapshot)) = (tracked_settings(record), record.snapshot()) else {
        return false;
    };
    settings.revised_field_names.iter().any(|name| {
        let current = record.values().get(name).unwrap_or(&Value::Null);
        let previous = snapshot.get(name).unwrap_or(&Value::Null);
        current != previous
    })
}

/// Archives the record's snapshot as a history record and returns the
/// archived revision number.
fn save_revision(db: &Database, record: &Record, settings: &RevisedSettings) -> Result<i64> {
    let history = settings.revision_model()?;
    let source = record.snapshot().unwrap_or_else(|| record.values());

    let values = settings.revised_field_names.iter().map(|name| {
        let value = source.get(name).cloned().unwrap_or(Value::Null);
        (name.as_str(), value)
    });
    let mut revision = db.instantiate(history, values)?;
    let pk = record.pk().map(Value::Integer).unwrap_or(Value::Null);
    revision.set(&settings.foreign_key_field_name, pk)?;
    db.save(&mut revision)?;

    let number = revision
        .get(&settings.revision_field_name)?
        .as_i64()
        .ok_or_else(|| {
            DbError::TypeMismatch(format!(
                "Revision number of {} is not an integer",
                record.display()
            ))
        })?;
    info!(
        model = %record.model().qualified_name(),
        pk = ?record.pk(),
        revision = number,
        "archived revision"
    );
    Ok(number)
}

fn settings_of(record: &Record) -> Result<Arc<RevisedSettings>> {
    tracked_settings(record).ok_or_else(|| {
        DbError::ExecutionError(format!("'{}' does not keep revisions", record.model().name()))
    })
}

/// Save, delete and revert for tracked types.
#[derive(Debug, Default, Clone, Copy)]
pub struct RevisedBehavior;

impl ModelBehavior for RevisedBehavior {
    fn save(&self, db: &Database, record: &mut Record) -> Result<()> {
        if record.pk().is_some() && has_changed(record) {
            let settings = settings_of(record)?;
            let archived = save_revision(db, record, &settings)?;
            record.set(&settings.revision_field_name, archived + 1)?;
        }
        db.save_base(record)
    }

    fn delete(&self, db: &Database, record: &mut Record, deep: bool) -> Result<()> {
        if record.pk().is_none() {
            return db.delete_base(record);
        }
        let settings = settings_of(record)?;
        if deep {
            let revisions = db.related(record, &settings.related_name)?;
            let count = revisions.len();
            for mut revision in revisions {
                db.delete(&mut revision, false)?;
            }
            info!(model = %record.model().qualified_name(), pk = ?record.pk(), count, "erased history");
        } else {
            save_revision(db, record, &settings)?;
        }
        db.delete_base(record)
    }

    fn revert_to_revision(&self, db: &Database, record: &mut Record, revision: i64) -> Result<()> {
        let settings = settings_of(record)?;
        let wanted = Value::Integer(revision);
        let archived = db
            .related(record, &settings.related_name)?
            .into_iter()
            .find(|r| r.get(&settings.revision_field_name).is_ok_and(|v| v == wanted))
            .ok_or_else(|| DbError::NoSuchRevision {
                revision,
                record: record.display(),
            })?;

        for name in &settings.revised_field_names {
            if name == &settings.revision_field_name {
                continue;
            }
            record.set(name, archived.get(name)?)?;
        }
        debug!(model = %record.model().name(), pk = ?record.pk(), revision, "reverted in memory");
        Ok(())
    }
}

impl Database {
    /// History records of a tracked record, newest revision first.
    pub fn revisions(&self, record: &Record) -> Result<Vec<Record>> {
        let settings = settings_of(record)?;
        self.related(record, &settings.related_name)
    }
}
