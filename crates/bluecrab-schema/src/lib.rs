//! Schema sidecar support for the BlueCrab record store.
//!
//! A schema file names the fields a deployment expects in block payloads.
//! The dialect is a deliberately forgiving line DSL: `table(...)`,
//! `document(...)`, or `collection(...)` opens a container, a `fields:` or
//! `schema:` list inside it declares `<type> <name>` entries, and anything
//! the parser does not recognize is skipped rather than rejected.
//!
//! # Key Types
//!
//! - [`Schema`] — ordered, bounded list of declared field names
//! - [`load_schema_file`] — read and parse a schema sidecar
//! - [`parse_schema_str`] — the pure parser

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{Result, SchemaError};
pub use loader::{load_schema_file, parse_schema_str};
pub use schema::Schema;
