//! Revision history for record types.
//!
//! A type declared through [`RevisedModelBuilder`] gets a revision-number
//! field and a companion history type holding one record per superseded
//! state. Saving a changed record archives the state it was loaded with;
//! deleting it either archives a final state or erases the whole history.
//!
//! ```
//! use revised::{Database, FieldKind, RevisedModelBuilder, Value};
//! use serde_json::json;
//!
//! # fn main() -> revised::Result<()> {
//! let db = Database::new();
//! let page = RevisedModelBuilder::new("Page")
//!     .field("title", FieldKind::CharField, json!({"max_length": 80}))
//!     .register(&db)?;
//!
//! let mut home = db.instantiate(&page, [("title", "Home")])?;
//! db.save(&mut home)?;
//! home.set("title", "Welcome")?;
//! db.save(&mut home)?;
//!
//! let revisions = db.revisions(&home)?;
//! assert_eq!(revisions.len(), 1);
//! assert_eq!(revisions[0].get("title")?, Value::from("Home"));
//! assert_eq!(home.get("revision")?, Value::Integer(2));
//! # Ok(())
//! # }
//! ```

pub mod history;
pub mod settings;
pub mod synth;
pub mod tracking;

pub use history::WriteOnceBehavior;
pub use settings::{RevisedSettings, SETTING_NAMES, resolve_settings};
pub use synth::RevisedModelBuilder;
pub use tracking::{RevisedBehavior, SNAPSHOT_DISPATCH_UID, SnapshotRecorder, has_changed, record_values};
