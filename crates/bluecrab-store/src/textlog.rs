//! Plain-text export and import of a chain.
//!
//! The log is a line format meant for hand inspection and `diff`: five
//! header lines per record, one `key=value` line per parsed field, records
//! separated by a blank line. Header lines are parsed strictly; everything
//! else is lenient and skipped with a warning. Import rebuilds blocks from
//! the stored headers without re-sealing them, so a verification pass over
//! the result catches any edit made to the file.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use bluecrab_chain::{Block, Chain};
use bluecrab_types::{join_fields, BlockHash, Field};

use crate::error::{Result, StoreError};

const INDEX_LABEL: &str = "Index:";
const TIMESTAMP_LABEL: &str = "Timestamp:";
const PREV_HASH_LABEL: &str = "Previous Hash:";
const CURR_HASH_LABEL: &str = "Current Hash:";
const DATA_LEN_LABEL: &str = "Data Length:";

/// Render the whole chain in the text log format.
pub fn render_log(chain: &Chain) -> String {
    let mut out = String::new();
    for block in chain {
        out.push_str(&format!("{INDEX_LABEL} {}\n", block.index));
        out.push_str(&format!("{TIMESTAMP_LABEL} {}\n", block.timestamp));
        out.push_str(&format!("{PREV_HASH_LABEL} {}\n", block.prev_hash));
        out.push_str(&format!("{CURR_HASH_LABEL} {}\n", block.curr_hash));
        out.push_str(&format!("{DATA_LEN_LABEL} {}\n", block.payload.len()));
        for field in &block.fields {
            out.push_str(&format!("{field}\n"));
        }
        out.push('\n');
    }
    out
}

/// Write the chain to `path` as a text log. Returns the record count.
pub fn export_chain_file(path: &Path, chain: &Chain) -> Result<usize> {
    fs::write(path, render_log(chain))?;
    debug!(path = %path.display(), records = chain.len(), "chain log exported");
    Ok(chain.len())
}

/// Read and parse a text log file into blocks.
pub fn import_chain_file(path: &Path) -> Result<Vec<Block>> {
    let text = fs::read_to_string(path)?;
    let blocks = parse_log(&text)?;
    debug!(path = %path.display(), records = blocks.len(), "chain log imported");
    Ok(blocks)
}

/// Parse log text into blocks.
///
/// A record starts at an `Index:` line and is closed by a blank line, the
/// next `Index:` line, or the end of the input. A record missing any of its
/// header lines is an error; field lines without a `=` or appearing before
/// the first record header are skipped.
pub fn parse_log(text: &str) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut pending: Option<PendingRecord> = None;

    for (number, raw) in text.lines().enumerate() {
        let number = number + 1;
        let line = raw.trim();

        if line.is_empty() {
            if let Some(record) = pending.take() {
                blocks.push(record.finish()?);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix(INDEX_LABEL) {
            if let Some(record) = pending.take() {
                blocks.push(record.finish()?);
            }
            let index = parse_number(rest, number, INDEX_LABEL)?;
            pending = Some(PendingRecord::new(number, index));
            continue;
        }
        let Some(record) = pending.as_mut() else {
            warn!(line = number, "log line before the first record header, skipping");
            continue;
        };
        if let Some(rest) = line.strip_prefix(TIMESTAMP_LABEL) {
            record.timestamp = Some(parse_number(rest, number, TIMESTAMP_LABEL)?);
        } else if let Some(rest) = line.strip_prefix(PREV_HASH_LABEL) {
            record.prev_hash = Some(parse_hash(rest, number, PREV_HASH_LABEL)?);
        } else if let Some(rest) = line.strip_prefix(CURR_HASH_LABEL) {
            record.curr_hash = Some(parse_hash(rest, number, CURR_HASH_LABEL)?);
        } else if let Some(rest) = line.strip_prefix(DATA_LEN_LABEL) {
            record.data_len = Some(parse_number(rest, number, DATA_LEN_LABEL)?);
        } else if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                warn!(line = number, "field line with an empty key, skipping");
            } else {
                record.fields.push(Field::new(key, value.trim()));
            }
        } else {
            warn!(line = number, "unrecognized log line, skipping");
        }
    }
    if let Some(record) = pending.take() {
        blocks.push(record.finish()?);
    }
    Ok(blocks)
}

/// One record being assembled from consecutive log lines.
struct PendingRecord {
    /// Line number of the record's `Index:` header, for error reporting.
    line: usize,
    index: u64,
    timestamp: Option<u64>,
    prev_hash: Option<BlockHash>,
    curr_hash: Option<BlockHash>,
    data_len: Option<u64>,
    fields: Vec<Field>,
}

impl PendingRecord {
    fn new(line: usize, index: u64) -> Self {
        Self {
            line,
            index,
            timestamp: None,
            prev_hash: None,
            curr_hash: None,
            data_len: None,
            fields: Vec::new(),
        }
    }

    fn finish(self) -> Result<Block> {
        let missing = |label: &str| StoreError::CorruptLog {
            line: self.line,
            reason: format!("record is missing its `{label}` header"),
        };
        let timestamp = self.timestamp.ok_or_else(|| missing(TIMESTAMP_LABEL))?;
        let prev_hash = self.prev_hash.ok_or_else(|| missing(PREV_HASH_LABEL))?;
        let curr_hash = self.curr_hash.ok_or_else(|| missing(CURR_HASH_LABEL))?;
        let data_len = self.data_len.ok_or_else(|| missing(DATA_LEN_LABEL))?;

        let payload = join_fields(&self.fields);
        if payload.len() as u64 != data_len {
            warn!(
                index = self.index,
                declared = data_len,
                actual = payload.len(),
                "data length header disagrees with reassembled payload"
            );
        }
        Ok(Block::from_parts(
            self.index, timestamp, prev_hash, curr_hash, payload,
        ))
    }
}

fn parse_number(rest: &str, line: usize, label: &str) -> Result<u64> {
    rest.trim().parse().map_err(|_| StoreError::CorruptLog {
        line,
        reason: format!("`{label}` value is not a number"),
    })
}

fn parse_hash(rest: &str, line: usize, label: &str) -> Result<BlockHash> {
    BlockHash::from_hex(rest.trim()).map_err(|e| StoreError::CorruptLog {
        line,
        reason: format!("`{label}` value is not a valid digest: {e}"),
    })
}
