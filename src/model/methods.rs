use std::collections::BTreeMap;
use std::sync::Arc;

use super::Record;
use crate::core::{Result, Value};

/// A user-defined method on a record type.
pub type Method = Arc<dyn Fn(&Record) -> Result<Value> + Send + Sync>;

pub type MethodTable = BTreeMap<String, Method>;

/// Name of the method used for a record's string representation.
pub const DISPLAY_METHOD: &str = "display";

/// Members every record type gets from the database itself.
pub const RESERVED_MEMBERS: &[&str] = &["save", "delete", "revert_to_revision", "pk"];
