// ============================================================================
// RustMemDB Revised Library
// ============================================================================

//! Record types with automatic revision history, on an in-memory store.
//!
//! Plain record types are declared with [`ModelBuilder`] and registered on
//! a [`Database`]. Types declared with [`RevisedModelBuilder`] also get a
//! history type: every save of a changed record archives the state it was
//! loaded with, and [`Database::revert_to_revision`] brings an archived
//! state back.

pub mod admin;
pub mod config;
pub mod core;
pub mod facade;
pub mod fields;
pub mod model;
pub mod prelude;
pub mod result;
pub mod revised;
pub mod storage;

// Re-export main types for convenience
pub use admin::{AdminSite, ModelAdmin};
pub use config::DatabaseConfig;
pub use core::{DataType, DbError, Result, Value};
pub use facade::{Database, LifecycleHook, Signals};
pub use fields::{Field, FieldKind};
pub use model::{ModelBuilder, ModelType, Record, SchemaSpec};
pub use result::QueryResult;
pub use revised::{RevisedModelBuilder, RevisedSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_database_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Database>();
    }

    #[test]
    fn test_public_api() {
        let db = Database::with_config(DatabaseConfig::new().name("api"));
        let doc = RevisedModelBuilder::new("Doc")
            .field("body", FieldKind::TextField, json!({}))
            .register(&db)
            .unwrap();

        let mut record = db.instantiate(&doc, [("body", "v1")]).unwrap();
        db.save(&mut record).unwrap();
        record.set("body", "v2").unwrap();
        db.save(&mut record).unwrap();

        let history = db.revisions(&record).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].get("body").unwrap(), Value::from("v1"));
    }
}
