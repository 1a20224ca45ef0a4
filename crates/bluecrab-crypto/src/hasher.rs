use bluecrab_types::BlockHash;

/// Domain-separated BLAKE3 hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation. This prevents cross-type collisions: two byte streams fed to
/// hashers with different tags produce different digests.
pub struct BlockHasher {
    domain: &'static str,
}

impl BlockHasher {
    /// Hasher for chain blocks.
    pub const CHAIN: Self = Self {
        domain: "bluecrab-block-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn digest(&self, data: &[u8]) -> BlockHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        BlockHash::from_bytes(*hasher.finalize().as_bytes())
    }

    /// Compute the canonical digest of a block's sealed content.
    ///
    /// The preimage is the domain tag and `":"`, then `index` and
    /// `timestamp` as little-endian u64, then the 32 `prev_hash` bytes,
    /// then the payload. Sealing and every verification path compute
    /// digests through this function, so the covered fields are fixed here
    /// and nowhere else. `prev_hash` must already hold its final value
    /// when this is called.
    pub fn block_hash(
        &self,
        index: u64,
        timestamp: u64,
        prev_hash: &BlockHash,
        payload: &[u8],
    ) -> BlockHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(&index.to_le_bytes());
        hasher.update(&timestamp.to_le_bytes());
        hasher.update(prev_hash.as_bytes());
        hasher.update(payload);
        BlockHash::from_bytes(*hasher.finalize().as_bytes())
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
