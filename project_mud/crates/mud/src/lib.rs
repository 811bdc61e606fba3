//! Mode-driven session logic for the telnet MUD: login, character
//! creation, the in-game command set, and the per-connection engine.

pub mod commands;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod mode;
pub mod modes;
pub mod render;
pub mod repo;
pub mod view;

pub use context::GameContext;
pub use dispatch::{handle_message, logout, start, switch_modes};
pub use engine::{run_session, serve, shutdown_sessions, ExitReason, SessionConfig};
pub use error::{CommandError, ConfigError};
pub use mode::{Command, CommandHandler, Description, EnterHook, Mode, ModeRegistry, Response};
pub use modes::standard_modes;
pub use render::Renderer;
pub use repo::PlayerRepo;
