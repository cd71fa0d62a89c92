use super::field::FieldAttrs;
use super::kind::allowed_arguments;
use crate::core::Result;

/// Attributes accepted by every field type's constructor.
pub const DEFAULT_ALLOWED_ARGS: &[&str] = &[
    "null",
    "blank",
    "choices",
    "core",
    "db_column",
    "db_index",
    "db_tablespace",
    "default",
    "editable",
    "help_text",
    "unique",
    "unique_for_date",
    "unique_for_month",
    "unique_for_year",
    "validator_list",
    "name",
];

/// Keeps only the attributes that `type_name`'s constructor accepts.
///
/// Anything else is dropped without complaint. The only failure is a type
/// name missing from the argument table.
pub fn filter_attrs(attrs: &FieldAttrs, type_name: &str) -> Result<FieldAttrs> {
    let specific = allowed_arguments(type_name)?;

    Ok(attrs
        .iter()
        .filter(|(key, _)| {
            DEFAULT_ALLOWED_ARGS.contains(&key.as_str()) || specific.contains(&key.as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect())
}
