use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Unknown season, bad hyper-parameter, table shape mismatch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A state or action vector with the wrong length or an out-of-range component.
    #[error("domain violation: {0}")]
    DomainViolation(String),

    #[error("malformed value table: {0}")]
    MalformedTable(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::DomainViolation(message.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(format!("config serialization: {err}"))
    }
}
