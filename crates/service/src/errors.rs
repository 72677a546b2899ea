use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already exists: {0}")]
    DuplicateKey(String),
    #[error("user not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl StoreError {
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::Unavailable(reason.to_string())
    }
}
