//! Field catalog: the concrete field kinds a record type can declare,
//! their constructor vocabulary, and the best-effort argument filter used
//! when a field has to be re-created on another record type.

pub mod field;
pub mod filter;
pub mod kind;

pub use field::{Field, FieldAttrs};
pub use filter::{DEFAULT_ALLOWED_ARGS, filter_attrs};
pub use kind::{FieldKind, allowed_arguments, field_type_names};
