pub mod error;
pub mod memory;

pub use error::PersistenceError;
pub use memory::MemoryStore;

/// Key-value byte store for player records, keyed by player name.
///
/// Each call is atomic per key. Nothing spans keys.
pub trait PlayerStore: Send + Sync {
    /// Fetch the bytes stored under `key`. A missing key is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Store `bytes` under `key`, replacing any previous value.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError>;

    /// Store `bytes` only if `key` is absent. Returns false when it already existed.
    fn create(&self, key: &str, bytes: &[u8]) -> Result<bool, PersistenceError>;
}
