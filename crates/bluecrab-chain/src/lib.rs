//! Hash-linked block chains for the BlueCrab record store.
//!
//! # Key Types
//!
//! - [`Block`] — one sealed record: canonical fields plus parsed `key=value` pairs
//! - [`Chain`] — append, verify, repair, and query over a block sequence
//! - [`AcceptancePolicy`] — injectable gate consulted before a block lands
//!
//! Verification walks the chain from genesis and short-circuits at the
//! first offending index. A chain of length zero is an explicit error
//! state for both verify and repair.

pub mod block;
pub mod chain;
pub mod error;
pub mod policy;

pub use block::Block;
pub use chain::Chain;
pub use error::ChainError;
pub use policy::{AcceptancePolicy, RequireParsedFields, Verdict};
