//! Fixed-record binary persistence.
//!
//! The storage file is headerless: a flat array of fixed-size records, one
//! per block. Each record is an explicit little-endian encoding, never a
//! dump of the in-memory representation:
//!
//! ```text
//! [2 bytes: format version (u16 LE, currently 1)]
//! [2 bytes: reserved, written as zero]
//! [8 bytes: index (u64 LE)]
//! [8 bytes: timestamp (u64 LE)]
//! [32 bytes: prev_hash]
//! [32 bytes: curr_hash]
//! [4 bytes: payload length (u32 LE, at most MAX_PAYLOAD_BYTES)]
//! [512 bytes: payload, zero padded]
//! ```
//!
//! A file whose size is not an exact multiple of the record size is
//! rejected before any record is decoded.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

use bluecrab_chain::{Block, Chain};
use bluecrab_types::{BlockHash, MAX_PAYLOAD_BYTES};

use crate::error::{Result, StoreError};

/// On-disk format version written to every record.
pub const FORMAT_VERSION: u16 = 1;

/// Size of one record: 88 header bytes plus the payload area.
pub const RECORD_SIZE: usize = 88 + MAX_PAYLOAD_BYTES;

const INDEX_AT: usize = 4;
const TIMESTAMP_AT: usize = 12;
const PREV_HASH_AT: usize = 20;
const CURR_HASH_AT: usize = 52;
const PAYLOAD_LEN_AT: usize = 84;
const PAYLOAD_AT: usize = 88;

/// Append one encoded record to `out`.
pub fn encode_record(block: &Block, out: &mut Vec<u8>) -> Result<()> {
    if block.payload.len() > MAX_PAYLOAD_BYTES {
        return Err(StoreError::InvalidArgument(format!(
            "payload of block {} is {} bytes, limit is {MAX_PAYLOAD_BYTES}",
            block.index,
            block.payload.len()
        )));
    }
    out.try_reserve(RECORD_SIZE)
        .map_err(|e| StoreError::Allocation(e.to_string()))?;

    let start = out.len();
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&block.index.to_le_bytes());
    out.extend_from_slice(&block.timestamp.to_le_bytes());
    out.extend_from_slice(block.prev_hash.as_bytes());
    out.extend_from_slice(block.curr_hash.as_bytes());
    out.extend_from_slice(&(block.payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&block.payload);
    out.resize(start + RECORD_SIZE, 0);
    Ok(())
}

/// Decode one record. `offset` is the record's position in the file, used
/// for error context only.
pub fn decode_record(bytes: &[u8], offset: u64) -> Result<Block> {
    if bytes.len() != RECORD_SIZE {
        return Err(StoreError::CorruptRecord {
            offset,
            reason: format!("record is {} bytes, expected {RECORD_SIZE}", bytes.len()),
        });
    }

    let version = u16::from_le_bytes([bytes[0], bytes[1]]);
    if version != FORMAT_VERSION {
        return Err(StoreError::CorruptRecord {
            offset,
            reason: format!("unsupported format version {version}"),
        });
    }

    let payload_len = read_u32(bytes, PAYLOAD_LEN_AT) as usize;
    if payload_len > MAX_PAYLOAD_BYTES {
        return Err(StoreError::CorruptRecord {
            offset,
            reason: format!("payload length {payload_len} exceeds limit {MAX_PAYLOAD_BYTES}"),
        });
    }

    Ok(Block::from_parts(
        read_u64(bytes, INDEX_AT),
        read_u64(bytes, TIMESTAMP_AT),
        read_hash(bytes, PREV_HASH_AT),
        read_hash(bytes, CURR_HASH_AT),
        bytes[PAYLOAD_AT..PAYLOAD_AT + payload_len].to_vec(),
    ))
}

/// Read every record of a storage file, in file order.
///
/// Rejects a file whose size is not a whole number of records before
/// decoding anything. Stored hashes are trusted here; callers verify the
/// resulting chain.
pub fn read_chain_file(path: &Path) -> Result<Vec<Block>> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    if size % RECORD_SIZE as u64 != 0 {
        return Err(StoreError::MisalignedFile {
            size,
            record_size: RECORD_SIZE as u64,
        });
    }

    let mut raw = Vec::new();
    raw.try_reserve(size as usize)
        .map_err(|e| StoreError::Allocation(e.to_string()))?;
    file.read_to_end(&mut raw)?;

    let mut blocks = Vec::new();
    blocks
        .try_reserve(raw.len() / RECORD_SIZE)
        .map_err(|e| StoreError::Allocation(e.to_string()))?;
    for (i, record) in raw.chunks_exact(RECORD_SIZE).enumerate() {
        blocks.push(decode_record(record, (i * RECORD_SIZE) as u64)?);
    }

    debug!(path = %path.display(), blocks = blocks.len(), "chain file read");
    Ok(blocks)
}

/// Write the whole chain to `path`, replacing prior contents.
///
/// Records are encoded into the reused `scratch` buffer and written with a
/// single `write_all`, then synced. Returns bytes written.
pub fn write_chain_file(path: &Path, chain: &Chain, scratch: &mut Vec<u8>) -> Result<u64> {
    scratch.clear();
    scratch
        .try_reserve(chain.len() * RECORD_SIZE)
        .map_err(|e| StoreError::Allocation(e.to_string()))?;
    for block in chain {
        encode_record(block, scratch)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(scratch)?;
    file.sync_all()?;

    debug!(
        path = %path.display(),
        blocks = chain.len(),
        bytes = scratch.len(),
        "chain file written"
    );
    Ok(scratch.len() as u64)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

fn read_hash(bytes: &[u8], at: usize) -> BlockHash {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&bytes[at..at + 32]);
    BlockHash::from_bytes(buf)
}
