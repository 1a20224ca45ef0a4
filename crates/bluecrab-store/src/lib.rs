//! Store handle and persistence for the BlueCrab record store.
//!
//! # Key Types
//!
//! - [`Store`] — the embedding handle: lifecycle, append, verify, repair,
//!   sync/flush, text export/import, and field queries
//! - [`StoreConfig`] — protocol name, sidecar paths, and write access
//! - [`StoreError`] — the store-level error taxonomy
//!
//! Persistence has two surfaces: a headerless binary file of fixed-size
//! records ([`record`]) and a human-readable export/import log
//! ([`textlog`]). Loading either surface verifies the chain before the
//! in-memory state is replaced; a load that fails leaves the handle as it
//! was.

pub mod config;
pub mod error;
pub mod handle;
pub mod record;
pub mod textlog;

pub use config::StoreConfig;
pub use error::StoreError;
pub use handle::{ImportOptions, Store};
pub use record::{FORMAT_VERSION, RECORD_SIZE};
