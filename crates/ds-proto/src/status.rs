//! Domain outcome of a store or handler operation (spec §9, "nested switch
//! on status codes"). Handlers reduce one of these to the wire status token
//! for their specific reply in a single `match`, instead of threading ad hoc
//! booleans and sentinel values through each call site.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    InvalidUid,
    InvalidGid,
    InvalidGName,
    NotLoggedIn,
    NotSubscribed,
    NotFound,
    /// A domain mismatch that isn't covered by a more specific variant,
    /// e.g. a password comparison failure or a supplied `GName` that
    /// doesn't match the stored one.
    Invalid,
    Full,
    Duplicate,
    Io(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok => write!(f, "ok"),
            Outcome::InvalidUid => write!(f, "invalid uid"),
            Outcome::InvalidGid => write!(f, "invalid gid"),
            Outcome::InvalidGName => write!(f, "invalid gname"),
            Outcome::NotLoggedIn => write!(f, "not logged in"),
            Outcome::NotSubscribed => write!(f, "not subscribed"),
            Outcome::NotFound => write!(f, "not found"),
            Outcome::Invalid => write!(f, "invalid"),
            Outcome::Full => write!(f, "group population full"),
            Outcome::Duplicate => write!(f, "duplicate"),
            Outcome::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl From<std::io::Error> for Outcome {
    fn from(e: std::io::Error) -> Self {
        Outcome::Io(e.to_string())
    }
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }
}
