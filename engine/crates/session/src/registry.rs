use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::outbox::Outbox;
use crate::player::Player;
use crate::{Race, SessionId};

/// Registry view of a logged-in player.
#[derive(Debug, Clone)]
pub struct OnlinePlayer {
    pub session_id: SessionId,
    pub name: String,
    pub level: u32,
    pub race: Race,
    pub outbox: Outbox,
}

impl OnlinePlayer {
    pub fn from_player(player: &Player) -> Self {
        Self {
            session_id: player.session_id,
            name: player.name.clone(),
            level: player.level,
            race: player.race,
            outbox: player.outbox.clone(),
        }
    }
}

/// Players currently logged in, keyed by name.
///
/// Writes take the exclusive lock, snapshots the shared one. The lock is
/// never held across I/O.
#[derive(Debug, Default)]
pub struct GameState {
    players: RwLock<BTreeMap<String, OnlinePlayer>>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, OnlinePlayer>> {
        self.players.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, OnlinePlayer>> {
        self.players.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a player. The last registrant wins: an entry held by another
    /// session is replaced and returned so the caller can shut it down.
    pub fn register(&self, entry: OnlinePlayer) -> Option<OnlinePlayer> {
        let session_id = entry.session_id;
        let previous = self.write().insert(entry.name.clone(), entry);
        previous.filter(|old| old.session_id != session_id)
    }

    /// Remove a name. Removing an absent name is a no-op.
    pub fn deregister(&self, name: &str) -> Option<OnlinePlayer> {
        self.write().remove(name)
    }

    /// Remove a name only if `session_id` still owns it.
    pub fn deregister_session(&self, name: &str, session_id: SessionId) -> bool {
        let mut players = self.write();
        match players.get(name) {
            Some(entry) if entry.session_id == session_id => {
                players.remove(name);
                true
            }
            _ => false,
        }
    }

    /// Consistent copy of all entries, sorted by name.
    pub fn snapshot(&self) -> Vec<OnlinePlayer> {
        self.read().values().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<OnlinePlayer> {
        self.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
