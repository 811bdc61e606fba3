use std::sync::Arc;

use session::GameState;

use crate::mode::ModeRegistry;
use crate::render::Renderer;
use crate::repo::PlayerRepo;

/// Shared handles every session and handler works against.
///
/// Cheap to clone. Nothing here is global; two contexts are fully independent.
#[derive(Clone, Debug)]
pub struct GameContext {
    pub modes: Arc<ModeRegistry>,
    pub players: Arc<GameState>,
    pub repo: PlayerRepo,
    pub renderer: Arc<Renderer>,
}

impl GameContext {
    pub fn new(modes: ModeRegistry, repo: PlayerRepo, renderer: Renderer) -> Self {
        Self {
            modes: Arc::new(modes),
            players: Arc::new(GameState::new()),
            repo,
            renderer: Arc::new(renderer),
        }
    }
}
