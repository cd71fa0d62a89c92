//! Common imports for declaring and using record types.
//!
//! ```
//! use revised::prelude::*;
//! ```

pub use crate::admin::{AdminSite, ModelAdmin};
pub use crate::config::DatabaseConfig;
pub use crate::core::{DbError, Result, Value};
pub use crate::facade::{Database, LifecycleHook};
pub use crate::fields::FieldKind;
pub use crate::model::{ModelBuilder, ModelType, Record, SchemaSpec};
pub use crate::revised::{RevisedModelBuilder, RevisedSettings};
