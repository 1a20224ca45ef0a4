//! The embedding handle over one configured store.
//!
//! A [`Store`] owns the in-memory chain, the loaded schema, an optional
//! acceptance policy, and a reusable encode buffer. All fallible
//! operations go through one dispatch point that records the failure
//! message, so embedders polling [`Store::last_error`] see the most recent
//! fault without threading error values through their own plumbing.
//!
//! Mutating operations require an open, writable handle. Loading from
//! either persistence surface verifies the candidate chain before the
//! in-memory state is replaced; a failed load changes nothing.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use bluecrab_chain::{AcceptancePolicy, Block, Chain, Verdict};
use bluecrab_schema::{load_schema_file, Schema};
use bluecrab_types::MAX_PAYLOAD_BYTES;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::{record, textlog};

/// Options for [`Store::import_log_with`].
#[derive(Clone, Copy, Debug)]
pub struct ImportOptions {
    /// Verify the imported chain before adopting it. Defaults to `true`;
    /// turning it off is for salvaging logs that will be repaired next.
    pub verify: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { verify: true }
    }
}

/// Handle over one configured record store.
///
/// Opening a store validates the configuration and yields an empty handle;
/// nothing is read from disk until [`sync`](Store::sync) or
/// [`load_schema`](Store::load_schema) is called. The handle requires
/// `&mut self` for every fallible operation, so one store instance has
/// exactly one writer.
pub struct Store {
    config: StoreConfig,
    open: bool,
    last_error: Option<String>,
    chain: Chain,
    schema: Schema,
    policy: Option<Box<dyn AcceptancePolicy>>,
    scratch: Vec<u8>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .field("open", &self.open)
            .field("last_error", &self.last_error)
            .field("chain", &self.chain)
            .field("schema", &self.schema)
            .field("policy", &self.policy.as_ref().map(|p| p.name()))
            .field("scratch", &self.scratch)
            .finish()
    }
}

impl Store {
    /// Open a handle over `config`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        if config.protocol.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "protocol name is empty".to_string(),
            ));
        }
        if config.schema_path.as_os_str().is_empty() {
            return Err(StoreError::InvalidArgument(
                "schema path is empty".to_string(),
            ));
        }
        if config.storage_path.as_os_str().is_empty() {
            return Err(StoreError::InvalidArgument(
                "storage path is empty".to_string(),
            ));
        }
        debug!(
            protocol = %config.protocol,
            writable = config.writable,
            "store opened"
        );
        Ok(Self {
            config,
            open: true,
            last_error: None,
            chain: Chain::new(),
            schema: Schema::new(),
            policy: None,
            scratch: Vec::new(),
        })
    }

    /// Close the handle, releasing all in-memory state.
    ///
    /// The chain is not flushed; callers that want the tail on disk call
    /// [`flush`](Store::flush) first.
    pub fn close(&mut self) {
        self.open = false;
        self.chain = Chain::new();
        self.schema = Schema::new();
        self.policy = None;
        self.scratch = Vec::new();
        self.last_error = None;
        debug!("store closed");
    }

    /// Seal `payload` into the next block and append it.
    ///
    /// The candidate is staged first; if an acceptance policy is installed
    /// it may reject the sealed candidate, and the chain is extended only
    /// on acceptance. Returns the committed index.
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        let result = self.append_inner(payload);
        self.track(result)
    }

    /// Verify the in-memory chain from genesis.
    pub fn verify(&mut self) -> Result<()> {
        let result = self.verify_inner();
        self.track(result)
    }

    /// Verify the chain, then run the acceptance policy over every block.
    ///
    /// Catches blocks that predate the policy's installation.
    pub fn verify_with_hook(&mut self) -> Result<()> {
        let result = self.verify_with_hook_inner();
        self.track(result)
    }

    /// Re-derive linkage and digests in place, trusting payload content.
    ///
    /// Returns how many blocks changed.
    pub fn repair(&mut self) -> Result<usize> {
        let result = self.repair_inner();
        self.track(result)
    }

    /// Load the chain from the storage file, replacing in-memory state.
    ///
    /// The loaded chain is verified first; on any failure the handle keeps
    /// the chain it had. Returns the number of blocks adopted.
    pub fn sync(&mut self) -> Result<usize> {
        let result = self.sync_inner();
        self.track(result)
    }

    /// Write the in-memory chain to the storage file.
    ///
    /// The file is rewritten whole. Returns the number of bytes written.
    pub fn flush(&mut self) -> Result<u64> {
        let result = self.flush_inner();
        self.track(result)
    }

    /// Export the chain to `path` as a text log. Returns the record count.
    pub fn export_log(&mut self, path: &Path) -> Result<usize> {
        let result = self.export_inner(path);
        self.track(result)
    }

    /// Import a text log from `path`, verifying before adoption.
    pub fn import_log(&mut self, path: &Path) -> Result<usize> {
        self.import_log_with(path, ImportOptions::default())
    }

    /// Import a text log from `path` with explicit options.
    pub fn import_log_with(&mut self, path: &Path, options: ImportOptions) -> Result<usize> {
        let result = self.import_inner(path, options);
        self.track(result)
    }

    /// Load the schema sidecar named by the configuration.
    ///
    /// On failure the previously loaded schema is kept. Returns the number
    /// of declared fields.
    pub fn load_schema(&mut self) -> Result<usize> {
        let result = self.load_schema_inner();
        self.track(result)
    }

    /// Install an acceptance policy consulted on every append.
    pub fn set_validation_hook(&mut self, policy: Box<dyn AcceptancePolicy>) {
        debug!(policy = policy.name(), "validation hook installed");
        self.policy = Some(policy);
    }

    /// Remove the acceptance policy, returning it if one was installed.
    pub fn clear_validation_hook(&mut self) -> Option<Box<dyn AcceptancePolicy>> {
        self.policy.take()
    }

    /// Position of `name` in the loaded schema.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.schema.position(name)
    }

    /// Number of fields the loaded schema declares.
    pub fn field_count(&self) -> usize {
        self.schema.field_count()
    }

    /// Index of the first block at or after `start` carrying the exact
    /// key/value pair.
    pub fn find_block_by_field(&self, key: &str, value: &str, start: u64) -> Option<u64> {
        self.chain.find_by_field(key, value, start)
    }

    /// The block at `index`.
    pub fn block_by_index(&self, index: u64) -> Result<&Block> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.chain.get(i))
            .ok_or(StoreError::NotFound(index))
    }

    /// Number of blocks in the in-memory chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns `true` if the chain holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Index of the tip block.
    pub fn last_index(&self) -> Option<u64> {
        self.chain.last_index()
    }

    /// The configured protocol label.
    pub fn protocol(&self) -> &str {
        &self.config.protocol
    }

    /// Returns `true` while the handle is open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Returns `true` if mutating operations are allowed.
    pub fn is_writable(&self) -> bool {
        self.config.writable
    }

    /// The in-memory chain.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// The loaded schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Path of the binary chain file.
    pub fn storage_path(&self) -> &Path {
        &self.config.storage_path
    }

    /// Path of the schema sidecar.
    pub fn schema_path(&self) -> &Path {
        &self.config.schema_path
    }

    /// Message of the most recent failed operation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Forget the recorded failure message.
    pub fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.last_error = Some(err.to_string());
        }
        result
    }

    fn require_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::InvalidArgument("store is not open".to_string()))
        }
    }

    fn require_writable(&self) -> Result<()> {
        self.require_open()?;
        if self.config.writable {
            Ok(())
        } else {
            Err(StoreError::NotWritable)
        }
    }

    fn append_inner(&mut self, payload: &[u8]) -> Result<u64> {
        self.require_writable()?;
        if payload.is_empty() {
            return Err(StoreError::InvalidArgument("payload is empty".to_string()));
        }
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(StoreError::InvalidArgument(format!(
                "payload length {} exceeds the {MAX_PAYLOAD_BYTES} byte limit",
                payload.len()
            )));
        }
        let candidate = self.chain.stage_next(unix_now(), payload);
        if let Some(policy) = &self.policy {
            if let Verdict::Reject { reason } = policy.evaluate(&candidate) {
                return Err(StoreError::PolicyRejected {
                    policy: policy.name().to_string(),
                    index: candidate.index,
                    reason,
                });
            }
        }
        Ok(self.chain.commit(candidate)?)
    }

    fn verify_inner(&self) -> Result<()> {
        self.require_open()?;
        Ok(self.chain.verify()?)
    }

    fn verify_with_hook_inner(&self) -> Result<()> {
        self.require_open()?;
        self.chain.verify()?;
        if let Some(policy) = &self.policy {
            for block in &self.chain {
                if let Verdict::Reject { reason } = policy.evaluate(block) {
                    return Err(StoreError::PolicyRejected {
                        policy: policy.name().to_string(),
                        index: block.index,
                        reason,
                    });
                }
            }
        }
        Ok(())
    }

    fn repair_inner(&mut self) -> Result<usize> {
        self.require_writable()?;
        Ok(self.chain.repair()?)
    }

    fn sync_inner(&mut self) -> Result<usize> {
        self.require_open()?;
        let blocks = record::read_chain_file(&self.config.storage_path)?;
        let candidate = Chain::from_blocks(blocks);
        candidate.verify()?;
        let adopted = candidate.len();
        self.chain = candidate;
        debug!(blocks = adopted, "chain synchronized from storage");
        Ok(adopted)
    }

    fn flush_inner(&mut self) -> Result<u64> {
        self.require_writable()?;
        record::write_chain_file(&self.config.storage_path, &self.chain, &mut self.scratch)
    }

    fn export_inner(&self, path: &Path) -> Result<usize> {
        self.require_open()?;
        textlog::export_chain_file(path, &self.chain)
    }

    fn import_inner(&mut self, path: &Path, options: ImportOptions) -> Result<usize> {
        self.require_writable()?;
        let blocks = textlog::import_chain_file(path)?;
        let candidate = Chain::from_blocks(blocks);
        if options.verify {
            candidate.verify()?;
        } else {
            warn!(path = %path.display(), "adopting imported chain without verification");
        }
        let adopted = candidate.len();
        self.chain = candidate;
        debug!(blocks = adopted, "imported chain adopted");
        Ok(adopted)
    }

    fn load_schema_inner(&mut self) -> Result<usize> {
        self.require_open()?;
        let schema = load_schema_file(&self.config.schema_path)?;
        if schema.is_empty() {
            warn!(
                path = %self.config.schema_path.display(),
                "schema file declared no fields"
            );
        }
        let count = schema.field_count();
        self.schema = schema;
        Ok(count)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use bluecrab_chain::{ChainError, RequireParsedFields};
    use tempfile::TempDir;

    use super::*;
    use crate::record::RECORD_SIZE;

    fn test_config(dir: &TempDir) -> StoreConfig {
        StoreConfig {
            protocol: "test".to_string(),
            schema_path: dir.path().join("test.schema"),
            storage_path: dir.path().join("test.db"),
            writable: true,
        }
    }

    fn open_store(dir: &TempDir) -> Store {
        Store::open(test_config(dir)).unwrap()
    }

    #[test]
    fn open_rejects_empty_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.protocol = "  ".to_string();
        assert!(matches!(
            Store::open(config).unwrap_err(),
            StoreError::InvalidArgument(_)
        ));
    }

    #[test]
    fn open_rejects_empty_storage_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.storage_path = std::path::PathBuf::new();
        assert!(matches!(
            Store::open(config).unwrap_err(),
            StoreError::InvalidArgument(_)
        ));
    }

    #[test]
    fn first_append_is_genesis() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);

        let index = store.append(b"temp=20;hum=55").unwrap();
        assert_eq!(index, 0);
        assert_eq!(store.len(), 1);

        let genesis = store.block_by_index(0).unwrap();
        assert!(genesis.prev_hash.is_zero());
        assert_eq!(genesis.field_count(), 2);
    }

    #[test]
    fn append_rejects_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);

        let err = store.append(b"").unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert!(store.last_error().unwrap().contains("payload"));
    }

    #[test]
    fn append_rejects_oversized_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);

        let payload = vec![b'x'; MAX_PAYLOAD_BYTES + 1];
        let err = store.append(&payload).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn read_only_store_refuses_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(test_config(&dir).read_only()).unwrap();

        assert!(matches!(
            store.append(b"a=1").unwrap_err(),
            StoreError::NotWritable
        ));
        assert!(matches!(
            store.repair().unwrap_err(),
            StoreError::NotWritable
        ));
        assert!(matches!(store.flush().unwrap_err(), StoreError::NotWritable));
    }

    #[test]
    fn closed_store_refuses_operations() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        store.close();

        assert!(!store.is_open());
        assert!(matches!(
            store.append(b"a=1").unwrap_err(),
            StoreError::InvalidArgument(_)
        ));
        assert!(matches!(
            store.verify().unwrap_err(),
            StoreError::InvalidArgument(_)
        ));
    }

    #[test]
    fn verify_of_empty_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);

        let err = store.verify().unwrap_err();
        assert!(matches!(err, StoreError::Chain(ChainError::Empty)));
    }

    #[test]
    fn policy_rejection_aborts_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        store.set_validation_hook(Box::new(RequireParsedFields));

        let err = store.append(b"no delimiter here").unwrap_err();
        match err {
            StoreError::PolicyRejected { policy, index, .. } => {
                assert_eq!(policy, "require-parsed-fields");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.is_empty());

        store.append(b"temp=20").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn verify_with_hook_flags_preexisting_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        store.append(b"plain bytes").unwrap();
        store.append(b"temp=20").unwrap();

        store.verify().unwrap();
        store.set_validation_hook(Box::new(RequireParsedFields));
        let err = store.verify_with_hook().unwrap_err();
        assert!(matches!(
            err,
            StoreError::PolicyRejected { index: 0, .. }
        ));
    }

    #[test]
    fn cleared_hook_is_no_longer_consulted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        store.set_validation_hook(Box::new(RequireParsedFields));

        assert!(store.clear_validation_hook().is_some());
        store.append(b"plain bytes").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn flush_then_sync_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = open_store(&dir);
        for i in 0..3 {
            writer.append(format!("n={i}").as_bytes()).unwrap();
        }
        let bytes = writer.flush().unwrap();
        assert_eq!(bytes, (3 * RECORD_SIZE) as u64);

        let mut reader = Store::open(test_config(&dir).read_only()).unwrap();
        assert_eq!(reader.sync().unwrap(), 3);
        assert_eq!(reader.chain(), writer.chain());
    }

    #[test]
    fn sync_without_storage_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);

        let err = store.sync().unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.last_error().is_some());
    }

    #[test]
    fn sync_of_empty_storage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        fs::write(store.storage_path(), b"").unwrap();

        let err = store.sync().unwrap_err();
        assert!(matches!(err, StoreError::Chain(ChainError::Empty)));
    }

    #[test]
    fn sync_keeps_chain_on_misaligned_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        store.append(b"n=0").unwrap();
        fs::write(store.storage_path(), b"short").unwrap();

        let err = store.sync().unwrap_err();
        assert!(matches!(err, StoreError::MisalignedFile { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sync_discards_tampered_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = open_store(&dir);
        for i in 0..3 {
            writer.append(format!("n={i}").as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        // First payload byte of the second record.
        let mut bytes = fs::read(writer.storage_path()).unwrap();
        bytes[RECORD_SIZE + 88] ^= 0x01;
        fs::write(writer.storage_path(), &bytes).unwrap();

        let mut reader = open_store(&dir);
        let err = reader.sync().unwrap_err();
        assert!(matches!(
            err,
            StoreError::Chain(ChainError::HashMismatch { index: 1 })
        ));
        assert!(reader.is_empty());
    }

    #[test]
    fn export_import_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("chain.log");
        let mut writer = open_store(&dir);
        for i in 0..3 {
            writer.append(format!("n={i}").as_bytes()).unwrap();
        }
        assert_eq!(writer.export_log(&log).unwrap(), 3);

        let mut reader = open_store(&dir);
        assert_eq!(reader.import_log(&log).unwrap(), 3);
        assert_eq!(reader.chain(), writer.chain());
    }

    #[test]
    fn import_verifies_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("chain.log");
        let mut writer = open_store(&dir);
        for i in 0..3 {
            writer.append(format!("n={i}").as_bytes()).unwrap();
        }
        writer.export_log(&log).unwrap();

        let edited = fs::read_to_string(&log).unwrap().replace("n=1", "n=9");
        fs::write(&log, edited).unwrap();

        let mut reader = open_store(&dir);
        let err = reader.import_log(&log).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Chain(ChainError::HashMismatch { index: 1 })
        ));
        assert!(reader.is_empty());
    }

    #[test]
    fn unverified_import_can_be_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("chain.log");
        let mut writer = open_store(&dir);
        for i in 0..3 {
            writer.append(format!("n={i}").as_bytes()).unwrap();
        }
        writer.export_log(&log).unwrap();

        let edited = fs::read_to_string(&log).unwrap().replace("n=1", "n=9");
        fs::write(&log, edited).unwrap();

        let mut reader = open_store(&dir);
        let options = ImportOptions { verify: false };
        assert_eq!(reader.import_log_with(&log, options).unwrap(), 3);
        assert!(reader.verify().is_err());

        assert!(reader.repair().unwrap() >= 1);
        reader.verify().unwrap();
        assert_eq!(reader.block_by_index(1).unwrap().payload, b"n=9");
    }

    #[test]
    fn load_schema_reports_declared_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        fs::write(
            store.schema_path(),
            "table(Sensor) {\n  fields: [string id, i32 value]\n}\n",
        )
        .unwrap();

        assert_eq!(store.load_schema().unwrap(), 2);
        assert_eq!(store.field_count(), 2);
        assert_eq!(store.field_index("id"), Some(0));
        assert_eq!(store.field_index("value"), Some(1));
        assert_eq!(store.field_index("absent"), None);
    }

    #[test]
    fn failed_schema_load_keeps_previous_schema() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        fs::write(store.schema_path(), "table(T) { fields: [u8 a] }\n").unwrap();
        store.load_schema().unwrap();
        fs::remove_file(store.schema_path()).unwrap();

        let err = store.load_schema().unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)));
        assert_eq!(store.field_count(), 1);
    }

    #[test]
    fn block_by_index_misses_with_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        store.append(b"a=1").unwrap();

        let err = store.block_by_index(5).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(5)));
    }

    #[test]
    fn find_block_by_field_scans_forward() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        for payload in ["name=a", "name=b", "name=a"] {
            store.append(payload.as_bytes()).unwrap();
        }

        assert_eq!(store.find_block_by_field("name", "a", 0), Some(0));
        assert_eq!(store.find_block_by_field("name", "a", 1), Some(2));
        assert_eq!(store.find_block_by_field("name", "zz", 0), None);
    }

    #[test]
    fn last_error_records_most_recent_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        assert!(store.last_error().is_none());

        store.append(b"").unwrap_err();
        assert!(store.last_error().unwrap().contains("invalid argument"));

        store.clear_last_error();
        assert!(store.last_error().is_none());
    }

    #[test]
    fn close_releases_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        store.append(b"a=1").unwrap();
        store.append(b"b=2").unwrap();

        store.close();
        assert!(!store.is_open());
        assert!(store.is_empty());
        assert_eq!(store.last_index(), None);
    }

    #[test]
    fn status_accessors_reflect_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        assert_eq!(store.protocol(), "test");
        assert!(store.is_writable());
        assert!(store.is_open());
        assert!(store.storage_path().ends_with("test.db"));
        assert!(store.schema_path().ends_with("test.schema"));
    }
}
