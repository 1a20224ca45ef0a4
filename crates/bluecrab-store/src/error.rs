use std::io;

use thiserror::Error;

use bluecrab_chain::ChainError;
use bluecrab_schema::SchemaError;

/// Errors produced by the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A supplied value was empty or out of range, or the handle is not
    /// open.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Mutation attempted on a read-only store.
    #[error("store is not writable")]
    NotWritable,

    /// I/O error during file operations.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Growing a persistence buffer failed.
    #[error("allocation failure: {0}")]
    Allocation(String),

    /// Storage file size is not a whole number of records.
    #[error("storage file size {size} is not a multiple of record size {record_size}")]
    MisalignedFile { size: u64, record_size: u64 },

    /// A binary record failed structural decoding.
    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    /// An export log record failed structural parsing.
    #[error("corrupt log at line {line}: {reason}")]
    CorruptLog { line: usize, reason: String },

    /// Chain integrity failure, carrying the offending index where known.
    #[error("chain integrity: {0}")]
    Chain(#[from] ChainError),

    /// The acceptance policy refused a block.
    #[error("policy {policy} rejected block {index}: {reason}")]
    PolicyRejected {
        policy: String,
        index: u64,
        reason: String,
    },

    /// Block lookup missed.
    #[error("block {0} not found")]
    NotFound(u64),

    /// Schema sidecar could not be loaded.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration could not be parsed or rendered.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the store crate.
pub type Result<T> = std::result::Result<T, StoreError>;
