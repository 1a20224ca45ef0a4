//! Lenient line-oriented parser for schema sidecar files.
//!
//! ```text
//! # comment lines and blank lines are skipped
//! table(Sensor) {
//!     fields: [string id, i32 value]
//! }
//! ```
//!
//! `document(...)` and `collection(...)` open containers the same way as
//! `table(...)`, and `schema:` introduces a list the same way as `fields:`.
//! A list may be delimited by `[...]` or `{...}`, written inline or spread
//! over several lines with one `<type> <name>` entry per line. The field
//! name is the last whitespace-separated token of an entry. Unrecognized
//! lines are skipped without error; names past the schema capacity are
//! dropped.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::schema::Schema;

/// Keywords that open a container block.
const CONTAINER_KEYWORDS: &[&str] = &["table(", "document(", "collection("];

/// Keywords that introduce a field list inside a container.
const LIST_KEYWORDS: &[&str] = &["fields:", "schema:"];

enum State {
    /// Outside any container.
    Scan,
    /// Inside a container body, no list open.
    Body,
    /// Saw a list keyword, waiting for the opening delimiter.
    AwaitOpen,
    /// Collecting entries until the closing delimiter.
    List { closer: char },
}

/// Parse schema text. Never fails; unrecognized input is skipped.
pub fn parse_schema_str(input: &str) -> Schema {
    let mut schema = Schema::new();
    let mut state = State::Scan;

    for raw in input.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        state = match state {
            State::Scan => {
                if CONTAINER_KEYWORDS.iter().any(|kw| line.contains(kw)) {
                    State::Body
                } else {
                    State::Scan
                }
            }
            State::Body => {
                if line.starts_with('}') {
                    State::Scan
                } else if let Some(tail) = list_tail(line) {
                    open_list(tail, &mut schema)
                } else {
                    State::Body
                }
            }
            State::AwaitOpen => open_list(line, &mut schema),
            State::List { closer } => match line.find(closer) {
                Some(end) => {
                    take_entries(&line[..end], &mut schema);
                    State::Body
                }
                None => {
                    take_entries(line, &mut schema);
                    State::List { closer }
                }
            },
        };
    }

    schema
}

/// Read and parse a schema file.
///
/// An unreadable file is an I/O error; a readable file that declares no
/// fields parses to an empty schema.
pub fn load_schema_file(path: &Path) -> Result<Schema> {
    let text = fs::read_to_string(path)?;
    let schema = parse_schema_str(&text);
    debug!(
        path = %path.display(),
        fields = schema.field_count(),
        "schema loaded"
    );
    Ok(schema)
}

/// The text after a list keyword, if the line contains one.
fn list_tail(line: &str) -> Option<&str> {
    LIST_KEYWORDS
        .iter()
        .find_map(|kw| line.find(kw).map(|pos| &line[pos + kw.len()..]))
}

/// Handle text expected to contain a list's opening delimiter.
fn open_list(rest: &str, schema: &mut Schema) -> State {
    let Some(pos) = rest.find(['[', '{']) else {
        // Delimiter may arrive on a later line.
        return State::AwaitOpen;
    };
    let closer = if rest[pos..].starts_with('[') { ']' } else { '}' };
    let body = &rest[pos + 1..];
    match body.find(closer) {
        Some(end) => {
            take_entries(&body[..end], schema);
            State::Body
        }
        None => {
            take_entries(body, schema);
            State::List { closer }
        }
    }
}

/// Split a chunk on commas and record each entry's field name.
fn take_entries(chunk: &str, schema: &mut Schema) {
    for entry in chunk.split(',') {
        let Some(name) = entry.split_whitespace().last() else {
            continue;
        };
        if !schema.push(name) {
            debug!(field = name, "schema at capacity, dropping field");
        }
    }
}
