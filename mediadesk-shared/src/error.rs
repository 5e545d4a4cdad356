use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("I/O error: {0}")]
    IOError(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("blob store error: {0}")]
    BlobStore(String),
    #[error("validation error: {0}")]
    Validation(String),
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound(_))
    }
}

impl From<std::io::Error> for ContentError {
    fn from(err: std::io::Error) -> Self {
        ContentError::IOError(err.to_string())
    }
}

impl From<sea_orm::DbErr> for ContentError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::RecordNotFound(msg) => ContentError::NotFound(msg),
            other => ContentError::Persistence(other.to_string()),
        }
    }
}
