use persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerDbError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),
}

impl From<PlayerDbError> for PersistenceError {
    fn from(e: PlayerDbError) -> Self {
        match e {
            PlayerDbError::CreateDir(io) => PersistenceError::Io(io),
            other => PersistenceError::Backend(other.to_string()),
        }
    }
}
