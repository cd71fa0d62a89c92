pub mod database;
pub mod registry;
pub mod signals;

pub use database::Database;
pub use registry::ModuleRegistry;
pub use signals::{LifecycleHook, Signals};
