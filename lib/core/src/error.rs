use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Vector/code count mismatch: {vectors} vectors, {codes} codes")]
    LengthMismatch { vectors: usize, codes: usize },

    #[error("Index is empty")]
    EmptyIndex,

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Index slot {slot} out of range [0, {len})")]
    SlotOutOfRange { slot: usize, len: usize },

    #[error("Engine is not initialized")]
    NotInitialized,

    #[error("Image error: {0}")]
    Image(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
