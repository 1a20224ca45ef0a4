//! Foundation types for the BlueCrab record store.
//!
//! This crate provides the digest, field, and capacity types shared by the
//! rest of the workspace. Every other BlueCrab crate depends on
//! `bluecrab-types`.
//!
//! # Key Types
//!
//! - [`BlockHash`] — 32-byte block digest (BLAKE3 output)
//! - [`Field`] — parsed `key=value` pair from a block payload
//! - [`limits`] — capacity bounds enforced across the store

pub mod error;
pub mod field;
pub mod hash;
pub mod limits;

pub use error::TypeError;
pub use field::{join_fields, parse_fields, Field};
pub use hash::BlockHash;
pub use limits::{MAX_PAYLOAD_BYTES, MAX_SCHEMA_FIELDS};
