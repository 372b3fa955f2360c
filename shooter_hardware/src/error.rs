use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    /// The sensor answered but the reading cannot be trusted.
    #[error("sensor fault: {0}")]
    SensorFault(String),
    #[error("command out of range: {0}")]
    OutOfRange(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
