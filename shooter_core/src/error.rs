use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShooterError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    #[error("sensor anomaly: {0}")]
    SensorAnomaly(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing shooter motor outputs")]
    MissingMotor,
    #[error("missing shooter encoder")]
    MissingEncoder,
    #[error("missing tunable '{0}'")]
    MissingTunable(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
