use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("refusing to store a record under an empty key")]
    EmptyKey,
}

impl From<bincode::Error> for PersistenceError {
    fn from(e: bincode::Error) -> Self {
        PersistenceError::Serialization(e.to_string())
    }
}
