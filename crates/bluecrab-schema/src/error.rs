use thiserror::Error;

/// Errors from schema loading.
///
/// Parsing itself never fails; only reading the file can. A readable file
/// that declares nothing is a valid empty schema, not an error.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
