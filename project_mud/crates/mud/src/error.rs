use session::ModeId;
use thiserror::Error;

/// Problems in the mode table, caught when the table is built at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("mode {0} is defined more than once")]
    DuplicateMode(ModeId),

    #[error("mode {0} is not defined")]
    MissingMode(ModeId),

    #[error("command word '{word}' is used more than once in mode {mode}")]
    CommandCollision { mode: ModeId, word: String },

    #[error("mode {0} has a command with an empty name or alias")]
    EmptyCommandWord(ModeId),
}

/// Failures a handler cannot turn into a reply. The session ends on these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("player has no active mode")]
    NoActiveMode,
}
