//! Capacity limits enforced across the store.
//!
//! All bounds are defined here so every layer enforces the same numbers.

/// Maximum payload size in bytes for a single block.
///
/// Appends reject larger payloads; the on-disk record reserves exactly this
/// much payload space per block.
pub const MAX_PAYLOAD_BYTES: usize = 512;

/// Maximum number of field names a schema holds.
///
/// Declarations beyond this bound are dropped without error.
pub const MAX_SCHEMA_FIELDS: usize = 32;
