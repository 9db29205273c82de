//! Error type for the client library. Follows the same shape as
//! `ds_proto::Error`: a closed set of variants, manual `Display`/
//! `std::error::Error`, and a wrapped I/O error.

use std::{fmt, io};

#[derive(Debug)]
pub enum Error {
    /// Underlying I/O failure (socket, connect, read/write).
    Io(io::Error),
    /// No reply arrived within the retry budget (spec §5: 3-second receive
    /// timeout, retried up to 3 times total).
    Timeout,
    /// The server's reply did not parse as the expected tag/shape.
    Protocol(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Timeout => write!(f, "no reply after 3 attempts"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ds_proto::Error> for Error {
    fn from(e: ds_proto::Error) -> Self {
        match e {
            ds_proto::Error::Io(io) => Error::Io(io),
            other => Error::Protocol(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
