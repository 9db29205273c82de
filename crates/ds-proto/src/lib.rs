#![forbid(unsafe_code)]
//! Wire protocol codec for the Directory Server.
//!
//! This crate owns everything that is purely about *framing and
//! validating* the protocol described in spec §3, §4.1 and §6: the field
//! validators, the tagged identifier types built on top of them, the
//! line-oriented UDP codec, and the streaming TCP field reader. It knows
//! nothing about sockets, the filesystem store, or request routing — those
//! live in `ds-store` and `ds-server`.
//!
//! # Wire grammar
//!
//! UDP requests and replies, and single-line TCP replies, are
//! `"TAG f1 f2 … fk\n"`: a fixed 3-letter tag, then space-separated fields,
//! terminated by a single `\n` ([`line::encode_line`] / [`line::decode_line`]).
//!
//! TCP requests carry a variable-length text payload and an optional
//! variable-length attachment, each preceded by a declared length. Because
//! the separator between the text and the optional attachment is itself
//! meaningful (`' '` vs `'\n'`), this can't be tokenized generically —
//! handlers drive [`reader::FieldReader`] one primitive call per grammar
//! production.

pub mod error;
pub mod line;
pub mod reader;
pub mod status;
pub mod tags;
pub mod types;
pub mod validate;

pub use error::{Error, Result};
pub use reader::{FieldReader, Terminator};
pub use status::Outcome;
pub use types::{Fname, Fsize, GName, Gid, Mid, Pass, Tsize, Uid};
