use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VigilError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No common time interval: {0}")]
    NoOverlap(String),

    #[error("Empty series: {0}")]
    EmptySeries(String),

    #[error("Missing field: {0}")]
    MissingField(String),
}

pub type Result<T> = std::result::Result<T, VigilError>;
