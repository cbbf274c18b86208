use thiserror::Error;

#[derive(Error, Debug)]
pub enum QnaError {
    #[error("question is empty")]
    EmptyQuestion,
    #[error("knowledge base unavailable: {0}")]
    SourceUnavailable(String),
    #[error("answer provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("other: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, QnaError>;

impl From<anyhow::Error> for QnaError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}
