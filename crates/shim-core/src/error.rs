use thiserror::Error;

/// Common errors for all cishim components
#[derive(Error, Debug)]
pub enum ShimError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Missing required parameter '{0}'")]
    MissingParam(String),

    #[error("Parameter '{name}' value '{value}' does not match its pattern")]
    InvalidParam { name: String, value: String },

    #[error("No free port among candidates {0:?}")]
    NoFreePort(Vec<u16>),

    #[error("Endpoint {url} not ready after {attempts} attempts: {last_error}")]
    NotReady {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<std::io::Error> for ShimError {
    fn from(err: std::io::Error) -> Self {
        ShimError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShimError>;
