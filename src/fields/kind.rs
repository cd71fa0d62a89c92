use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

use crate::core::{DataType, DbError, Result};

/// Concrete field types known to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    AutoField,
    BooleanField,
    CharField,
    TextField,
    IntegerField,
    PositiveIntegerField,
    SmallIntegerField,
    FloatField,
    DecimalField,
    EmailField,
    SlugField,
    URLField,
    DateField,
    DateTimeField,
    ForeignKey,
}

const ALL_KINDS: [FieldKind; 15] = [
    FieldKind::AutoField,
    FieldKind::BooleanField,
    FieldKind::CharField,
    FieldKind::TextField,
    FieldKind::IntegerField,
    FieldKind::PositiveIntegerField,
    FieldKind::SmallIntegerField,
    FieldKind::FloatField,
    FieldKind::DecimalField,
    FieldKind::EmailField,
    FieldKind::SlugField,
    FieldKind::URLField,
    FieldKind::DateField,
    FieldKind::DateTimeField,
    FieldKind::ForeignKey,
];

/// Arguments every field constructor accepts through the base field,
/// whether or not the concrete kind lists them itself.
pub(crate) const BASE_CONSTRUCTOR_ARGS: &[&str] = &[
    "verbose_name",
    "name",
    "primary_key",
    "max_length",
    "unique",
    "blank",
    "null",
    "db_index",
    "core",
    "default",
    "editable",
    "serialize",
    "unique_for_date",
    "unique_for_month",
    "unique_for_year",
    "validator_list",
    "choices",
    "help_text",
    "db_column",
    "db_tablespace",
];

lazy_static! {
    /// Kind name -> parameters declared by that kind's own constructor.
    static ref KIND_ARGUMENTS: HashMap<&'static str, (FieldKind, &'static [&'static str])> = {
        let mut table = HashMap::new();
        for kind in ALL_KINDS {
            table.insert(kind.name(), (kind, kind.declared_arguments()));
        }
        table
    };
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AutoField => "AutoField",
            Self::BooleanField => "BooleanField",
            Self::CharField => "CharField",
            Self::TextField => "TextField",
            Self::IntegerField => "IntegerField",
            Self::PositiveIntegerField => "PositiveIntegerField",
            Self::SmallIntegerField => "SmallIntegerField",
            Self::FloatField => "FloatField",
            Self::DecimalField => "DecimalField",
            Self::EmailField => "EmailField",
            Self::SlugField => "SlugField",
            Self::URLField => "URLField",
            Self::DateField => "DateField",
            Self::DateTimeField => "DateTimeField",
            Self::ForeignKey => "ForeignKey",
        }
    }

    /// Resolves a kind through the argument table; a name missing from the
    /// table is a field type this process does not know.
    pub fn from_name(name: &str) -> Result<Self> {
        KIND_ARGUMENTS
            .get(name)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| DbError::UnknownFieldType(name.to_string()))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::AutoField
            | Self::IntegerField
            | Self::PositiveIntegerField
            | Self::SmallIntegerField
            | Self::ForeignKey => DataType::Integer,
            Self::FloatField | Self::DecimalField => DataType::Float,
            Self::BooleanField => DataType::Boolean,
            Self::CharField
            | Self::TextField
            | Self::EmailField
            | Self::SlugField
            | Self::URLField
            | Self::DateField
            | Self::DateTimeField => DataType::Text,
        }
    }

    fn declared_arguments(&self) -> &'static [&'static str] {
        match self {
            Self::CharField | Self::EmailField | Self::SlugField => &["max_length"],
            Self::DecimalField => &["verbose_name", "name", "max_digits", "decimal_places"],
            Self::URLField => &["verbose_name", "name", "verify_exists"],
            Self::DateField | Self::DateTimeField => {
                &["verbose_name", "name", "auto_now", "auto_now_add"]
            }
            Self::ForeignKey => &["to", "to_field", "related_name"],
            Self::AutoField
            | Self::BooleanField
            | Self::TextField
            | Self::IntegerField
            | Self::PositiveIntegerField
            | Self::SmallIntegerField
            | Self::FloatField => &[],
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Constructor parameters declared by the named field type.
pub fn allowed_arguments(type_name: &str) -> Result<&'static [&'static str]> {
    KIND_ARGUMENTS
        .get(type_name)
        .map(|(_, args)| *args)
        .ok_or_else(|| DbError::UnknownFieldType(type_name.to_string()))
}

/// Every field type name in the table, sorted.
pub fn field_type_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = KIND_ARGUMENTS.keys().copied().collect();
    names.sort_unstable();
    names
}
