//! Error types for the Venkman stimulus engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid function definition: {0}")]
    InvalidFunction(String),

    #[error("Input value {input} is not within the expected function range of {minimum} to {maximum}")]
    OutOfRange { input: f64, minimum: f64, maximum: f64 },

    #[error("Index {index} for input {input} is out of function range (0 to {last})")]
    IndexOutOfRange { index: i64, input: f64, last: usize },

    #[error("Invalid behavior parameter {name}: {value} must be between {minimum} and {maximum}")]
    BehaviorParameter {
        name: &'static str,
        value: f64,
        minimum: f64,
        maximum: f64,
    },

    #[error("Invalid flash pattern: {0}")]
    FlashPattern(String),

    #[error("Matrix error: {0}")]
    Matrix(String),

    #[error("Rule {code} does not support version {version}")]
    UnsupportedVersion { code: String, version: String },

    #[error("Session {0} has already ended")]
    SessionEnded(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Out-of-range evaluations invalidate the experiment and must end the session.
    pub fn ends_session(&self) -> bool {
        matches!(self, Error::OutOfRange { .. } | Error::IndexOutOfRange { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
