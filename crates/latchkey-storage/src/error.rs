use thiserror::Error;

/// Storage-specific error types for the latchkey daemon.
///
/// Only writes surface as errors: a cache file that cannot be read or
/// parsed is treated as empty when loading.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The authorized set could not be encoded
    #[error("Cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StorageError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
