use std::sync::Arc;

use persistence::{PersistenceError, PlayerStore};
use session::{Player, PlayerRecord};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Run a store call that may block on disk.
///
/// On a multi-thread runtime the worker hands its other tasks off first, so
/// a slow write stalls only the calling session. Elsewhere the call runs inline.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Typed access to player records on top of a byte store.
#[derive(Clone)]
pub struct PlayerRepo {
    store: Arc<dyn PlayerStore>,
}

impl PlayerRepo {
    pub fn new(store: Arc<dyn PlayerStore>) -> Self {
        Self { store }
    }

    pub fn load(&self, name: &str) -> Result<Option<PlayerRecord>, PersistenceError> {
        match blocking(|| self.store.get(name))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, name: &str) -> Result<bool, PersistenceError> {
        Ok(blocking(|| self.store.get(name))?.is_some())
    }

    /// Overwrite the record stored under the player's name.
    pub fn save(&self, player: &Player) -> Result<(), PersistenceError> {
        let record = encode(player)?;
        blocking(|| self.store.put(&player.name, &record))?;
        tracing::debug!(player = %player.name, bytes = record.len(), "Saved player record");
        Ok(())
    }

    /// Store a brand-new record. Returns false if the name was claimed first.
    pub fn create(&self, player: &Player) -> Result<bool, PersistenceError> {
        let record = encode(player)?;
        blocking(|| self.store.create(&player.name, &record))
    }
}

fn encode(player: &Player) -> Result<Vec<u8>, PersistenceError> {
    if player.name.is_empty() {
        return Err(PersistenceError::EmptyKey);
    }
    Ok(bincode::serialize(&player.to_record())?)
}

impl std::fmt::Debug for PlayerRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerRepo").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::MemoryStore;
    use session::{outbox, Race};

    fn named(name: &str) -> Player {
        let (tx, _rx) = outbox(4);
        let mut p = Player::new(tx);
        p.name = name.into();
        p.race = Race::Belter;
        p.init_new_character();
        p
    }

    #[test]
    fn save_then_load() {
        let repo = PlayerRepo::new(Arc::new(MemoryStore::new()));
        let mut p = named("ceres");
        repo.save(&p).unwrap();
        p.experience = 50;
        repo.save(&p).unwrap();

        let record = repo.load("ceres").unwrap().unwrap();
        assert_eq!(record, p.to_record());
        assert!(repo.load("pallas").unwrap().is_none());
    }

    #[test]
    fn create_does_not_overwrite() {
        let repo = PlayerRepo::new(Arc::new(MemoryStore::new()));
        let first = named("ceres");
        assert!(repo.create(&first).unwrap());

        let mut second = named("ceres");
        second.level = 9;
        assert!(!repo.create(&second).unwrap());
        assert_eq!(repo.load("ceres").unwrap().unwrap().level, 1);
        assert!(repo.exists("ceres").unwrap());
    }

    #[test]
    fn unnamed_player_is_rejected() {
        let repo = PlayerRepo::new(Arc::new(MemoryStore::new()));
        let p = named("");
        assert!(matches!(repo.save(&p), Err(PersistenceError::EmptyKey)));
        assert!(matches!(repo.create(&p), Err(PersistenceError::EmptyKey)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn store_calls_inside_multi_thread_runtime() {
        let repo = PlayerRepo::new(Arc::new(MemoryStore::new()));
        let p = named("ceres");
        assert!(repo.create(&p).unwrap());
        repo.save(&p).unwrap();
        assert!(repo.exists("ceres").unwrap());

        // Other tasks keep running while a store call is in progress.
        let ticker = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        });
        assert_eq!(repo.load("ceres").unwrap().unwrap().level, 1);
        ticker.await.unwrap();
    }

    #[tokio::test]
    async fn store_calls_inside_current_thread_runtime() {
        let repo = PlayerRepo::new(Arc::new(MemoryStore::new()));
        repo.save(&named("ceres")).unwrap();
        assert!(repo.exists("ceres").unwrap());
    }

    #[test]
    fn corrupt_bytes_surface_as_serialization_error() {
        let store = Arc::new(MemoryStore::new());
        store.put("junk", &[0xff]).unwrap();
        let repo = PlayerRepo::new(store);
        assert!(matches!(repo.load("junk"), Err(PersistenceError::Serialization(_))));
    }
}
