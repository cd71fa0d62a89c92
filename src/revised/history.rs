use crate::core::{DbError, Result};
use crate::facade::Database;
use crate::model::{ModelBehavior, Record};

/// Save behavior of history types: the first save inserts, every later
/// save fails with [`DbError::RevisionExists`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteOnceBehavior;

impl ModelBehavior for WriteOnceBehavior {
    fn save(&self, db: &Database, record: &mut Record) -> Result<()> {
        if record.pk().is_none() {
            return db.save_base(record);
        }

        let revision = record
            .model()
            .meta()
            .revised_settings()
            .and_then(|settings| record.get(&settings.revision_field_name).ok())
            .and_then(|value| value.as_i64())
            .unwrap_or_default();
        Err(DbError::RevisionExists {
            revision,
            record: record.display(),
        })
    }
}
