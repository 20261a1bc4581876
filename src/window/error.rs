use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("window duration must be a positive whole number of milliseconds")]
    InvalidDuration,
    #[error("no representable window or watermark for {0}")]
    OutOfRange(DateTime<Utc>),
    #[error("window starting {0} has no data points")]
    Empty(DateTime<Utc>),
    #[error("window starting {start}: non-finite {field}")]
    NonFinite {
        start: DateTime<Utc>,
        field: &'static str,
    },
}
