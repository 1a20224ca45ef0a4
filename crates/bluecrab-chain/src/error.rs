use thiserror::Error;

/// Errors from chain operations and verification.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    /// Length zero is a deliberate error state for verify and repair.
    #[error("chain is empty")]
    Empty,

    #[error("genesis block has a non-zero previous hash")]
    GenesisPrevHash,

    #[error("sequence break at index {index}: block carries index {found}")]
    SequenceBreak { index: u64, found: u64 },

    #[error("broken link at index {index}: prev_hash does not match predecessor")]
    LinkBroken { index: u64 },

    #[error("hash mismatch at index {index}: computed digest differs from stored")]
    HashMismatch { index: u64 },
}

impl ChainError {
    /// The offending block index, where one exists.
    pub fn index(&self) -> Option<u64> {
        match self {
            Self::Empty => None,
            Self::GenesisPrevHash => Some(0),
            Self::SequenceBreak { index, .. }
            | Self::LinkBroken { index }
            | Self::HashMismatch { index } => Some(*index),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
