//! Storage backend implementations.
//!
//! - InMemoryStore: ephemeral storage for tests and dry runs
//! - FileStore: hex-keyed JSON snapshot, readable by hand
//! - BinaryStore: bincode snapshot
//!
//! Both on-disk stores keep the whole keyspace in memory and write a full
//! snapshot on `flush`. The snapshot is written to a temporary file and
//! renamed into place, so a crash mid-write leaves the previous snapshot.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Key type for storage operations
pub type StorageKey = Vec<u8>;

/// Value type for storage operations
pub type StorageValue = Vec<u8>;

/// Trait for storage backends
pub trait StorageBackend: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>>;

    /// Set a value for a key
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key, returning whether it existed
    fn delete(&self, key: &[u8]) -> Result<bool>;

    /// List all keys with a given prefix, in ascending byte order
    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>>;

    /// Flush any pending writes to persistent storage
    fn flush(&self) -> Result<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        (**self).get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        (**self).delete(key)
    }

    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>> {
        (**self).list_prefix(prefix)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        (**self).get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        (**self).delete(key)
    }

    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>> {
        (**self).list_prefix(prefix)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Internal(format!("Lock error: {}", e))
}

/// Full contents of a store, ordered by key
pub type Keyspace = BTreeMap<StorageKey, StorageValue>;

fn keys_with_prefix(data: &Keyspace, prefix: &[u8]) -> Vec<StorageKey> {
    data.range(prefix.to_vec()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, _)| k.clone())
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory storage backend (for testing and ephemeral use)
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<Keyspace>,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of entries
    pub fn len(&self) -> Result<usize> {
        Ok(self.data.read().map_err(lock_error)?.len())
    }

    /// Check if empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl StorageBackend for InMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self.data.write().map_err(lock_error)?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut data = self.data.write().map_err(lock_error)?;
        Ok(data.remove(key).is_some())
    }

    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(keys_with_prefix(&data, prefix))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT FORMATS
// ═══════════════════════════════════════════════════════════════════════════════

/// On-disk encoding of a whole keyspace
pub trait SnapshotFormat: Send + Sync + 'static {
    /// File name inside the store directory
    const FILE_NAME: &'static str;

    /// Encode the keyspace
    fn encode(data: &Keyspace) -> Result<Vec<u8>>;

    /// Decode a keyspace
    fn decode(bytes: &[u8]) -> Result<Keyspace>;
}

/// JSON object of hex key to hex value
#[derive(Debug)]
pub struct JsonSnapshot;

impl SnapshotFormat for JsonSnapshot {
    const FILE_NAME: &'static str = "data.json";

    fn encode(data: &Keyspace) -> Result<Vec<u8>> {
        let hexed: BTreeMap<String, String> = data
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();
        serde_json::to_vec_pretty(&hexed)
            .map_err(|e| Error::Serialization(format!("Failed to encode snapshot: {}", e)))
    }

    fn decode(bytes: &[u8]) -> Result<Keyspace> {
        let hexed: HashMap<String, String> = serde_json::from_slice(bytes)
            .map_err(|e| Error::Storage(format!("Failed to parse data file: {}", e)))?;

        hexed
            .into_iter()
            .map(|(k, v)| {
                let key = hex::decode(&k)
                    .map_err(|e| Error::Storage(format!("Invalid key in storage: {}", e)))?;
                let value = hex::decode(&v)
                    .map_err(|e| Error::Storage(format!("Invalid value in storage: {}", e)))?;
                Ok((key, value))
            })
            .collect()
    }
}

/// bincode-encoded map
#[derive(Debug)]
pub struct BincodeSnapshot;

impl SnapshotFormat for BincodeSnapshot {
    const FILE_NAME: &'static str = "data.bin";

    fn encode(data: &Keyspace) -> Result<Vec<u8>> {
        bincode::serialize(data)
            .map_err(|e| Error::Serialization(format!("Failed to encode snapshot: {}", e)))
    }

    fn decode(bytes: &[u8]) -> Result<Keyspace> {
        bincode::deserialize(bytes)
            .map_err(|e| Error::Storage(format!("Failed to deserialize data: {}", e)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Directory-backed store that persists its keyspace as one snapshot file
#[derive(Debug)]
pub struct SnapshotStore<F: SnapshotFormat> {
    base_path: PathBuf,
    cache: RwLock<Keyspace>,
    dirty: RwLock<bool>,
    _format: PhantomData<F>,
}

/// JSON file store
pub type FileStore = SnapshotStore<JsonSnapshot>;

/// Binary file store
pub type BinaryStore = SnapshotStore<BincodeSnapshot>;

impl<F: SnapshotFormat> SnapshotStore<F> {
    /// Open (or create) a store in the given directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                Error::Storage(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let data_file = base_path.join(F::FILE_NAME);
        let cache = if data_file.exists() {
            let bytes = fs::read(&data_file)
                .map_err(|e| Error::Storage(format!("Failed to read data file: {}", e)))?;
            F::decode(&bytes)?
        } else {
            Keyspace::new()
        };

        debug!(path = %data_file.display(), entries = cache.len(), "opened snapshot store");

        Ok(Self {
            base_path,
            cache: RwLock::new(cache),
            dirty: RwLock::new(false),
            _format: PhantomData,
        })
    }

    /// Path of the snapshot file
    pub fn data_file_path(&self) -> PathBuf {
        self.base_path.join(F::FILE_NAME)
    }

    fn mark_dirty(&self) -> Result<()> {
        *self.dirty.write().map_err(lock_error)? = true;
        Ok(())
    }

    fn save_to_disk(&self) -> Result<()> {
        let cache = self.cache.read().map_err(lock_error)?;
        let bytes = F::encode(&cache)?;

        let path = self.data_file_path();
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)
            .map_err(|e| Error::Storage(format!("Failed to write data file: {}", e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Storage(format!("Failed to replace data file: {}", e)))?;

        *self.dirty.write().map_err(lock_error)? = false;
        debug!(path = %path.display(), entries = cache.len(), "snapshot written");
        Ok(())
    }
}

impl<F: SnapshotFormat> StorageBackend for SnapshotStore<F> {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        let cache = self.cache.read().map_err(lock_error)?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.cache
            .write()
            .map_err(lock_error)?
            .insert(key.to_vec(), value.to_vec());
        self.mark_dirty()
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let existed = self.cache.write().map_err(lock_error)?.remove(key).is_some();
        if existed {
            self.mark_dirty()?;
        }
        Ok(existed)
    }

    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>> {
        let cache = self.cache.read().map_err(lock_error)?;
        Ok(keys_with_prefix(&cache, prefix))
    }

    fn flush(&self) -> Result<()> {
        let dirty = *self.dirty.read().map_err(lock_error)?;
        if dirty {
            self.save_to_disk()?;
        }
        Ok(())
    }
}

impl<F: SnapshotFormat> Drop for SnapshotStore<F> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPED STORE WRAPPER
// ═══════════════════════════════════════════════════════════════════════════════

/// Type-safe wrapper around a storage backend (bincode values)
pub struct TypedStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> TypedStore<B> {
    /// Create a new typed store
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get a typed value
    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.backend.get(key)? {
            Some(data) => {
                let value = bincode::deserialize(&data).map_err(|e| {
                    Error::Deserialization(format!("Failed to deserialize value: {}", e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value
    pub fn set<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        let data = bincode::serialize(value)
            .map_err(|e| Error::Serialization(format!("Failed to serialize value: {}", e)))?;
        self.backend.set(key, &data)
    }

    /// Delete a value
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        self.backend.delete(key)
    }

    /// List keys with prefix
    pub fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>> {
        self.backend.list_prefix(prefix)
    }

    /// Flush pending writes
    pub fn flush(&self) -> Result<()> {
        self.backend.flush()
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// Key prefixes for different data types
pub mod prefixes {
    /// Loan record prefix (followed by the 20 borrower address bytes)
    pub const LOAN: &[u8] = crate::utils::constants::LOAN_PREFIX;
}

/// Create a key with a prefix
pub fn make_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(prefix.len() + key.len());
    result.extend_from_slice(prefix);
    result.extend_from_slice(key);
    result
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
