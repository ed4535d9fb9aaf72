use thiserror::Error;

/// Error type for catalog, triple-store and item-list operations.
///
/// Missing entities on read paths are reported as `Ok(None)` or an empty
/// collection; `NotFound` is reserved for mutations that name something absent.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl CatalogError {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        CatalogError::NotFound(msg.into())
    }

    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        CatalogError::MalformedInput(msg.into())
    }

    pub fn unavailable<T: Into<String>>(msg: T) -> Self {
        CatalogError::BackendUnavailable(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        CatalogError::Query(msg.into())
    }

    pub fn parse<T: Into<String>>(msg: T) -> Self {
        CatalogError::Parse(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        CatalogError::Io(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        CatalogError::Conflict(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
