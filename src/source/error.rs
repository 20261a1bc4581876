use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("input directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tle format")]
    InvalidTleFormat,
    #[error("invalid tle: {0}")]
    InvalidTle(#[from] sgp4::TleError),
    #[error("elements error: {0}")]
    Elements(#[from] sgp4::ElementsError),
    #[error("propagation error: {0}")]
    Propagation(String),
}
