use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Todoist API error ({status}): {message}")]
    Todoist { status: u16, message: String },

    #[error("Notion API error ({status}): {message}")]
    Notion { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Sync error during {phase}: {message}")]
    Sync { phase: String, message: String },

    #[error("Invalid URL: {0}")]
    UrlParse(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status carried by an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Todoist { status, .. } | Error::Notion { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(e: rusqlite_migration::Error) -> Self {
        Error::Migration(e.to_string())
    }
}

impl<E: fmt::Display> From<tokio_rusqlite::Error<E>> for Error {
    fn from(e: tokio_rusqlite::Error<E>) -> Self {
        Error::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
