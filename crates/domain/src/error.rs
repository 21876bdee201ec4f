use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("tag length mismatch: {tags} tag names but rows of width {width}")]
    ShapeMismatch { tags: usize, width: usize },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DomainError {
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }
}

impl From<rust_xlsxwriter::XlsxError> for DomainError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        match err {
            rust_xlsxwriter::XlsxError::IoError(io) => Self::Io(io),
            other => Self::Serialization(other.to_string()),
        }
    }
}

impl From<calamine::XlsxError> for DomainError {
    fn from(err: calamine::XlsxError) -> Self {
        match err {
            calamine::XlsxError::Io(io) => Self::Io(io),
            other => Self::Serialization(other.to_string()),
        }
    }
}
