use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown source: {0}")]
    UnknownSource(String),
}
