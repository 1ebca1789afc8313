use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Device store lock poisoned")]
    StorePoisoned,
}

pub type Result<T> = std::result::Result<T, Error>;
