use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("latitude out of range: {0}")]
    LatitudeOutOfRange(f64),
    #[error("longitude out of range: {0}")]
    LongitudeOutOfRange(f64),
    #[error("invalid event time: {0}")]
    InvalidTime(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::Malformed(err.to_string())
    }
}
