#![forbid(unsafe_code)]
//! Protocol-level client library for the Directory Server.
//!
//! Mirrors `ds-proto`'s split between wire concerns and domain concerns: this
//! crate owns request construction, reply parsing, and the UDP retry
//! contract, while [`session::Session`] tracks the client-side-only
//! Anonymous/LoggedIn/SelectedGroup state the REPL binary uses to avoid
//! re-asking the user for a UID/GID on every command.

pub mod client;
pub mod error;
pub mod session;

pub use client::{
    Client, GroupInfo, ListUsersOutcome, PostOutcome, RegisterOutcome, RetrieveOutcome,
    RetrievedMessage, SelectOutcome, SimpleOutcome, UnsubscribeOutcome,
};
pub use error::{Error, Result};
pub use session::Session;
