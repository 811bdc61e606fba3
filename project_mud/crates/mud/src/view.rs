use serde::Serialize;
use session::{OnlinePlayer, Player, Race};

/// Template context for a single player.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub name: String,
    pub level: u32,
    pub experience: u64,
    pub hit_points: i32,
    pub max_hit_points: i32,
    pub special_points: i32,
    pub race: Race,
    pub has_name: bool,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            name: p.name.clone(),
            level: p.level,
            experience: p.experience,
            hit_points: p.hit_points,
            max_hit_points: p.max_hit_points,
            special_points: p.special_points,
            race: p.race,
            has_name: !p.name.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WhoEntry {
    pub name: String,
    pub level: u32,
    pub race: Race,
}

/// Template context for the `who` listing.
#[derive(Debug, Clone, Serialize)]
pub struct WhoView {
    pub count: usize,
    pub players: Vec<WhoEntry>,
}

impl WhoView {
    pub fn new(online: &[OnlinePlayer]) -> Self {
        Self {
            count: online.len(),
            players: online
                .iter()
                .map(|p| WhoEntry {
                    name: p.name.clone(),
                    level: p.level,
                    race: p.race,
                })
                .collect(),
        }
    }
}
