use std::fmt;

#[derive(Debug)]
pub enum Error {
    ConfigError(String),

    MetadataError(String),

    PumpError(String),

    SqlxError(sqlx::Error),

    IoError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigError(error)
            | Error::MetadataError(error)
            | Error::PumpError(error) => error.fmt(f),
            Error::SqlxError(error) => error.fmt(f),
            Error::IoError(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::SqlxError(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}
