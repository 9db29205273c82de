//! Streaming TCP field reader (spec §4.1).
//!
//! The TCP wire grammar is context-sensitive: a text length precedes the
//! text, and the byte following the text is itself meaningful (`' '` vs
//! `'\n'` decides whether an attachment follows). A generic tokenizer can't
//! frame that; handlers drive [`FieldReader`] directly, one primitive call
//! per grammar production.

use crate::error::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Which byte ended a [`FieldReader::read_word`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminator {
    Space,
    Newline,
}

/// Wraps an `AsyncRead` half of a TCP connection and exposes the three
/// streaming primitives handlers need. Holds no internal buffer beyond the
/// single in-flight word, so it never reads past the byte a caller asked
/// for — a later `read_bytes(Tsize, ...)` call sees exactly the stream
/// position left by the previous `read_word`.
pub struct FieldReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FieldReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Block until exactly `n` bytes have been read, or the peer closes.
    pub async fn read_fixed(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Read bytes one at a time until a space or newline terminator is
    /// consumed. Returns the word with the terminator excluded, and which
    /// terminator was seen. Fails with [`Error::FieldTooLong`] if more than
    /// `max_len` bytes precede the terminator.
    pub async fn read_word(&mut self, max_len: usize) -> Result<(String, Terminator)> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            self.inner.read_exact(&mut byte).await?;
            match byte[0] {
                b' ' => return Ok((String::from_utf8_lossy(&buf).into_owned(), Terminator::Space)),
                b'\n' => {
                    return Ok((String::from_utf8_lossy(&buf).into_owned(), Terminator::Newline));
                }
                b => {
                    if buf.len() >= max_len {
                        return Err(Error::FieldTooLong { max_len });
                    }
                    buf.push(b);
                }
            }
        }
    }

    /// Copy exactly `n` bytes from the stream, for text of a declared
    /// `Tsize` or an attachment body of a declared `Fsize`.
    pub async fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.read_fixed(n).await
    }

    /// Read and discard exactly one byte, asserting it's the expected
    /// terminator. Used after `read_bytes` for the separator that follows
    /// text (`' '` if an attachment follows, `'\n'` otherwise) — callers
    /// that need to branch on *which* terminator should read the byte
    /// themselves instead.
    pub async fn read_terminator(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.inner.read_exact(&mut byte).await?;
        Ok(byte[0])
    }
}
