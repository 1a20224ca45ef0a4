use serde::{Deserialize, Serialize};

use bluecrab_crypto::BlockHasher;
use bluecrab_types::{parse_fields, BlockHash, Field};

/// One sealed record in a chain.
///
/// A block is sealed by [`Block::next`]: all canonical fields (index,
/// timestamp, prev_hash, payload) are assigned first and `curr_hash` is
/// computed last, over exactly those fields. After sealing, any change to
/// them makes [`recompute_hash`](Block::recompute_hash) disagree with
/// `curr_hash`, which is what chain verification detects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, dense from zero.
    pub index: u64,
    /// Seal time, seconds since the UNIX epoch.
    pub timestamp: u64,
    /// The predecessor's `curr_hash`; zero for genesis.
    pub prev_hash: BlockHash,
    /// Canonical digest of this block's sealed content.
    pub curr_hash: BlockHash,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// `key=value` pairs parsed from the payload.
    pub fields: Vec<Field>,
}

impl Block {
    /// Seal the successor of `prev`, or the genesis block for `None`.
    pub fn next(prev: Option<&Block>, timestamp: u64, payload: &[u8]) -> Self {
        let (index, prev_hash) = match prev {
            Some(p) => (p.index + 1, p.curr_hash),
            None => (0, BlockHash::zero()),
        };
        let curr_hash = BlockHasher::CHAIN.block_hash(index, timestamp, &prev_hash, payload);
        Self {
            index,
            timestamp,
            prev_hash,
            curr_hash,
            payload: payload.to_vec(),
            fields: parse_fields(payload),
        }
    }

    /// Rehydrate a block from stored parts.
    ///
    /// Hashes are taken as stored; verification re-checks them.
    pub fn from_parts(
        index: u64,
        timestamp: u64,
        prev_hash: BlockHash,
        curr_hash: BlockHash,
        payload: Vec<u8>,
    ) -> Self {
        let fields = parse_fields(&payload);
        Self {
            index,
            timestamp,
            prev_hash,
            curr_hash,
            payload,
            fields,
        }
    }

    /// Canonical digest of the block's current content.
    pub fn recompute_hash(&self) -> BlockHash {
        BlockHasher::CHAIN.block_hash(self.index, self.timestamp, &self.prev_hash, &self.payload)
    }

    /// Number of parsed fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Refresh `fields` from the current payload bytes.
    pub fn reparse_fields(&mut self) {
        self.fields = parse_fields(&self.payload);
    }
}
