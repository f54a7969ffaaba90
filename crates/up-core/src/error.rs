use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Step cannot be disabled: {0}")]
    ProtectedStep(String),

    #[error("No logs found for step: {0}")]
    NoLogsForStep(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
