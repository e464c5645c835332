use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Any failure inside a search engine, whatever the backend.
    #[error("Search engine error: failed to {operation}: {source:#}")]
    SearchEngine {
        operation: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub fn search_engine(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Error::SearchEngine { operation: operation.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
