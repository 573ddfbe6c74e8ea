use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("JSON serialization error: {0}")]
    Json(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Backup storage error: {0}")]
    Storage(String),

    #[error("Live store error: {0}")]
    LiveStore(String),

    #[error("Host capability unavailable: {0}")]
    HostUnavailable(String),

    #[error("Timed out waiting for the current user after {attempts} attempts")]
    IdentityTimeout { attempts: u32 },

    #[error("Conflict decision abandoned: {0}")]
    DecisionAbandoned(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
