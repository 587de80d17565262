use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Invalid trade: {0}")]
    ValidationError(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, JournalError>;

impl JournalError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        JournalError::InvalidValue {
            field,
            value: value.into(),
        }
    }
}
