use chrono::{DateTime, Utc};
use std::fmt;

use crate::reading::SensorId;

#[derive(Debug)]
pub enum Error {
    /// Transport failure, timeout or a server-side failure status.
    Connection(String),
    /// The store rejected the query, or the query could not be formed.
    Query(String),
    NotFound(SensorId),
    Auth(String),
    /// The response body is not JSON or does not match the expected schema.
    Parse(String),
    InvalidRange { start: DateTime<Utc>, end: DateTime<Utc> },
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(msg) => write!(f, "connection error: {msg}"),
            Error::Query(msg) => write!(f, "query error: {msg}"),
            Error::NotFound(id) => write!(f, "sensor '{id}' not found"),
            Error::Auth(msg) => write!(f, "authentication failed: {msg}"),
            Error::Parse(msg) => write!(f, "could not parse response: {msg}"),
            Error::InvalidRange { start, end } => {
                write!(f, "invalid time window: start {start} is after end {end}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
