//! Hashing primitives for the BlueCrab record store.
//!
//! Provides domain-separated BLAKE3 hashing and the canonical block digest
//! computation used by chain sealing and verification.
//!
//! All hashing wraps an established library — no custom cryptography.

pub mod hasher;

pub use hasher::BlockHasher;
