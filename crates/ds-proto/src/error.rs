//! Error representation for the wire codec.
//!
//! Mirrors the small closed-variant `Error` enum the teacher crate keeps in
//! its own `error` module: a couple of domain variants plus a wrapped I/O
//! error, with manual `Display`/`std::error::Error` impls rather than a
//! macro-generated one.

use std::{fmt, io};

#[derive(Debug)]
pub enum Error {
    /// Underlying I/O failure (socket closed, read/write error, ...).
    Io(io::Error),
    /// A `ReadWord` field exceeded its declared maximum length before a
    /// terminator (space or newline) was seen.
    FieldTooLong { max_len: usize },
    /// A line or frame did not decode into the expected shape.
    InvalidFrame(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::FieldTooLong { max_len } => {
                write!(f, "field exceeded maximum length of {max_len} bytes")
            }
            Error::InvalidFrame(msg) => write!(f, "invalid frame: {msg}"),
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

pub type Result<T> = std::result::Result<T, Error>;
