pub mod outbox;
pub mod player;
pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use outbox::{outbox, Outbox, OutboxClosed, OutboxReceiver};
pub use player::{Player, PlayerRecord};
pub use registry::{GameState, OnlinePlayer};

/// Identity of one live connection. Replaced by the persisted uuid on login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First four hex digits, enough to tell sessions apart in logs.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..4].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// States of the per-player session machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModeId {
    Splash,
    LoginUsername,
    LoginPassword,
    CreateCharacter,
    Game,
}

impl ModeId {
    pub const ALL: [ModeId; 5] = [
        ModeId::Splash,
        ModeId::LoginUsername,
        ModeId::LoginPassword,
        ModeId::CreateCharacter,
        ModeId::Game,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeId::Splash => "Splash",
            ModeId::LoginUsername => "LoginUsername",
            ModeId::LoginPassword => "LoginPassword",
            ModeId::CreateCharacter => "CreateCharacter",
            ModeId::Game => "Game",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Race {
    #[default]
    None,
    Earther,
    Lunite,
    Belter,
}

impl Race {
    /// Case-insensitive lookup among the selectable races.
    pub fn parse(input: &str) -> Option<Race> {
        match input.trim().to_lowercase().as_str() {
            "earther" => Some(Race::Earther),
            "lunite" => Some(Race::Lunite),
            "belter" => Some(Race::Belter),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Race::None => "none",
            Race::Earther => "earther",
            Race::Lunite => "lunite",
            Race::Belter => "belter",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
