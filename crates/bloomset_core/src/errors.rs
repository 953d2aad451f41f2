use thiserror::Error;

#[derive(Debug, Error)]
pub enum BloomError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persist: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// n == 0, p outside (0,1), or a bit budget too large to allocate.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Persisted state whose lengths, seed counts or block shapes disagree.
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Bad magic or version")]
    BadHeader,

    #[error("Checksum mismatch")]
    Corrupt,

    #[error("Unsupported filter kind {0}")]
    Unsupported(u16),
}

pub type Result<T> = std::result::Result<T, BloomError>;

pub(crate) fn malformed(msg: impl Into<String>) -> BloomError {
    BloomError::MalformedSnapshot(msg.into())
}
