use crate::core::{DbError, Result};
use crate::facade::Database;

use super::Record;

/// Save/delete entry points of a record type.
///
/// [`Database::save`] and friends dispatch here, so a record type can wrap
/// the plain persist primitives (`save_base`, `delete_base`) with its own
/// protocol.
pub trait ModelBehavior: Send + Sync {
    fn save(&self, db: &Database, record: &mut Record) -> Result<()> {
        db.save_base(record)
    }

    fn delete(&self, db: &Database, record: &mut Record, _deep: bool) -> Result<()> {
        db.delete_base(record)
    }

    fn revert_to_revision(&self, _db: &Database, record: &mut Record, _revision: i64) -> Result<()> {
        Err(DbError::ExecutionError(format!(
            "Model '{}' does not keep revisions",
            record.model().name()
        )))
    }
}

/// Behavior of an ordinary record type.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainBehavior;

impl ModelBehavior for PlainBehavior {}
