use serde::{Deserialize, Serialize};
use tracing::debug;

use bluecrab_types::BlockHash;

use crate::block::Block;
use crate::error::{ChainError, Result};

/// An append-only sequence of hash-linked blocks.
///
/// A healthy chain upholds, for every position `i`: `blocks[i].index == i`,
/// `blocks[0].prev_hash` is zero, `blocks[i].prev_hash ==
/// blocks[i-1].curr_hash`, and every `curr_hash` equals its canonical
/// recomputation. [`verify`](Chain::verify) checks all four;
/// [`repair`](Chain::repair) restores them from payload content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt blocks loaded from storage without checking them.
    ///
    /// Callers are expected to run [`verify`](Chain::verify) before
    /// trusting the result.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the chain holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// The most recently appended block.
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Index of the tip block.
    pub fn last_index(&self) -> Option<u64> {
        self.tip().map(|b| b.index)
    }

    /// All blocks, in chain order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Iterate blocks in chain order.
    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Seal the candidate successor without extending the chain.
    ///
    /// Pairs with [`commit`](Chain::commit); an acceptance policy can
    /// inspect the sealed candidate in between.
    pub fn stage_next(&self, timestamp: u64, payload: &[u8]) -> Block {
        Block::next(self.tip(), timestamp, payload)
    }

    /// Append a staged block after re-checking that it extends the tip.
    ///
    /// Returns the committed index.
    pub fn commit(&mut self, block: Block) -> Result<u64> {
        let index = self.blocks.len() as u64;
        if block.index != index {
            return Err(ChainError::SequenceBreak {
                index,
                found: block.index,
            });
        }
        match self.tip() {
            Some(tip) => {
                if block.prev_hash != tip.curr_hash {
                    return Err(ChainError::LinkBroken { index });
                }
            }
            None => {
                if !block.prev_hash.is_zero() {
                    return Err(ChainError::GenesisPrevHash);
                }
            }
        }
        if block.recompute_hash() != block.curr_hash {
            return Err(ChainError::HashMismatch { index });
        }

        debug!(index, hash = %block.curr_hash.short_hex(), "block committed");
        self.blocks.push(block);
        Ok(index)
    }

    /// Verify the whole chain from genesis.
    ///
    /// Per block: dense index, genesis zero-prev (or back-link equality
    /// against the stored predecessor), and canonical hash recomputation
    /// against the stored `curr_hash`. The first failure short-circuits
    /// with the offending index. An empty chain is an error by design.
    pub fn verify(&self) -> Result<()> {
        if self.blocks.is_empty() {
            return Err(ChainError::Empty);
        }
        for (i, block) in self.blocks.iter().enumerate() {
            let index = i as u64;
            if block.index != index {
                return Err(ChainError::SequenceBreak {
                    index,
                    found: block.index,
                });
            }
            if i == 0 {
                if !block.prev_hash.is_zero() {
                    return Err(ChainError::GenesisPrevHash);
                }
            } else if block.prev_hash != self.blocks[i - 1].curr_hash {
                return Err(ChainError::LinkBroken { index });
            }
            if block.recompute_hash() != block.curr_hash {
                return Err(ChainError::HashMismatch { index });
            }
        }
        Ok(())
    }

    /// Re-derive linkage and digests in place, trusting payload content.
    ///
    /// Renumbers indices dense from zero, reassigns every back-link from
    /// the repaired predecessor, recomputes every digest, and refreshes
    /// parsed fields. Returns how many blocks changed; running it again on
    /// the result changes nothing. An empty chain is an error by design.
    pub fn repair(&mut self) -> Result<usize> {
        if self.blocks.is_empty() {
            return Err(ChainError::Empty);
        }
        let mut changed = 0;
        let mut prev_hash = BlockHash::zero();
        for (i, block) in self.blocks.iter_mut().enumerate() {
            let before = (block.index, block.prev_hash, block.curr_hash);
            block.index = i as u64;
            block.prev_hash = prev_hash;
            block.curr_hash = block.recompute_hash();
            block.reparse_fields();
            if (block.index, block.prev_hash, block.curr_hash) != before {
                changed += 1;
            }
            prev_hash = block.curr_hash;
        }
        debug!(blocks = self.blocks.len(), changed, "chain repaired");
        Ok(changed)
    }

    /// Index of the first block at or after `start` whose parsed fields
    /// contain the exact key/value pair.
    pub fn find_by_field(&self, key: &str, value: &str, start: u64) -> Option<u64> {
        let start = start.min(self.blocks.len() as u64) as usize;
        self.blocks[start..]
            .iter()
            .find(|b| b.fields.iter().any(|f| f.key == key && f.value == value))
            .map(|b| b.index)
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    fn payloads() -> impl Strategy<Value = Vec<Vec<u8>>> {
        prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..12)
    }

    fn chain_of(payloads: &[Vec<u8>]) -> Chain {
        let mut chain = Chain::new();
        for (i, payload) in payloads.iter().enumerate() {
            let block = chain.stage_next(i as u64, payload);
            chain.commit(block).unwrap();
        }
        chain
    }

    proptest! {
        #[test]
        fn appended_chains_always_verify(payloads in payloads()) {
            let chain = chain_of(&payloads);
            prop_assert!(chain.verify().is_ok());
        }

        #[test]
        fn repair_recovers_and_is_idempotent(
            payloads in payloads(),
            tamper in any::<prop::sample::Index>(),
        ) {
            let mut chain = chain_of(&payloads);
            let i = tamper.index(chain.len());
            chain.blocks[i].payload = b"tampered=1".to_vec();

            chain.repair().unwrap();
            prop_assert!(chain.verify().is_ok());

            let snapshot = chain.clone();
            prop_assert_eq!(chain.repair().unwrap(), 0);
            prop_assert_eq!(&chain, &snapshot);
        }
    }
}
