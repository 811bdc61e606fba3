use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::outbox::Outbox;
use crate::{ModeId, Race, SessionId};

/// The persisted subset of a [`Player`]. Connection state never lands here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub uuid: Uuid,
    pub level: u32,
    pub experience: u64,
    pub hit_points: i32,
    pub max_hit_points: i32,
    pub special_points: i32,
    pub race: Race,
}

/// Per-connection player state.
#[derive(Debug, Clone)]
pub struct Player {
    /// Fixed for the lifetime of the connection; used to own registry entries.
    pub session_id: SessionId,
    /// Ephemeral until a login merge replaces it with the persisted uuid.
    pub uuid: Uuid,
    pub name: String,
    pub level: u32,
    pub experience: u64,
    pub hit_points: i32,
    pub max_hit_points: i32,
    pub special_points: i32,
    pub race: Race,
    pub mode: Option<ModeId>,
    pub logged_in: bool,
    pub peer: Option<SocketAddr>,
    pub outbox: Outbox,
}

impl Player {
    pub fn new(outbox: Outbox) -> Self {
        let session_id = SessionId::new();
        Self {
            session_id,
            uuid: session_id.0,
            name: String::new(),
            level: 0,
            experience: 0,
            hit_points: 0,
            max_hit_points: 0,
            special_points: 0,
            race: Race::None,
            mode: None,
            logged_in: false,
            peer: None,
            outbox,
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Name once known, otherwise the first digits of the uuid.
    pub fn short_id(&self) -> String {
        if self.name.is_empty() {
            self.uuid.simple().to_string()[..4].to_string()
        } else {
            self.name.clone()
        }
    }

    /// A copy of this session with the persisted identity and progression
    /// taken from `record`. Session-only fields are kept.
    pub fn merge(&self, record: &PlayerRecord) -> Player {
        tracing::info!(
            player = %self.short_id(),
            from = %self.uuid,
            to = %record.uuid,
            "Merging persisted identity"
        );
        Player {
            uuid: record.uuid,
            name: record.name.clone(),
            level: record.level,
            experience: record.experience,
            hit_points: record.hit_points,
            max_hit_points: record.max_hit_points,
            special_points: record.special_points,
            race: record.race,
            ..self.clone()
        }
    }

    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            name: self.name.clone(),
            uuid: self.uuid,
            level: self.level,
            experience: self.experience,
            hit_points: self.hit_points,
            max_hit_points: self.max_hit_points,
            special_points: self.special_points,
            race: self.race,
        }
    }

    /// Starting stats for a freshly created character.
    pub fn init_new_character(&mut self) {
        self.level = 1;
        self.hit_points = 100;
        self.max_hit_points = 100;
        self.special_points = 0;
        self.experience = 0;
    }
}
