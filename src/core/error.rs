use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Model '{0}' already exists")]
    ModelExists(String),

    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    #[error("Field '{0}' not found on model '{1}'")]
    FieldNotFound(String, String),

    #[error("Duplicate field '{0}' on model '{1}'")]
    DuplicateField(String, String),

    #[error("Unknown field type '{0}'")]
    UnknownFieldType(String),

    #[error("{field_type}() got an unexpected argument '{argument}'")]
    InvalidFieldArgument { field_type: String, argument: String },

    #[error("Invalid meta option: {0}")]
    InvalidMetaOption(String),

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Model '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Revision {revision} does not exist for {record}")]
    NoSuchRevision { revision: i64, record: String },

    #[error("Revision {revision} already exists for {record}")]
    RevisionExists { revision: i64, record: String },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
