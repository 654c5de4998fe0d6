use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Credential errors
    #[error("Invalid fob format: {0}")]
    InvalidFobFormat(String),

    // Shared state errors
    #[error("Door state record must be {expected} bytes, got {actual}")]
    RecordSize { expected: usize, actual: usize },

    #[error("Invalid door position code: {code}")]
    InvalidDoorPosition { code: i32 },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
