pub mod behavior;
pub mod builder;
pub mod meta;
pub mod methods;
pub mod record;
pub mod spec;

pub use behavior::{ModelBehavior, PlainBehavior};
pub use builder::{DEFAULT_MODULE, MetaBlock, ModelBuilder};
pub use meta::{ModelMeta, ModelType, OrderBy};
pub use methods::{DISPLAY_METHOD, Method, MethodTable, RESERVED_MEMBERS};
pub use record::{FieldValues, Record};
pub use spec::{FieldSpec, ModelSpec, SchemaSpec};
