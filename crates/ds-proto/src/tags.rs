//! Fixed 3-character request/reply tags and status tokens (spec §4.4, §4.5,
//! §6). Kept as plain `&'static str` constants the way the original
//! protocol's `constant.hpp` does, rather than introducing an enum that
//! would need a fallible `TryFrom<&str>` at exactly one call site
//! ([`crate::line`]'s dispatcher already owns that decision).

// UDP requests / replies
pub const REG: &str = "REG";
pub const RRG: &str = "RRG";
pub const UNR: &str = "UNR";
pub const RUN: &str = "RUN";
pub const LOG: &str = "LOG";
pub const RLO: &str = "RLO";
pub const OUT: &str = "OUT";
pub const ROU: &str = "ROU";
pub const GLS: &str = "GLS";
pub const RGL: &str = "RGL";
pub const GSR: &str = "GSR";
pub const RGS: &str = "RGS";
pub const GUR: &str = "GUR";
pub const RGU: &str = "RGU";
pub const GLM: &str = "GLM";
pub const RGM: &str = "RGM";

// TCP requests / replies
pub const ULS: &str = "ULS";
pub const RUL: &str = "RUL";
pub const PST: &str = "PST";
pub const RPT: &str = "RPT";
pub const RTV: &str = "RTV";
pub const RRT: &str = "RRT";

// Status tokens
pub const OK: &str = "OK";
pub const NOK: &str = "NOK";
pub const DUP: &str = "DUP";
pub const NEW: &str = "NEW";
pub const EOF: &str = "EOF";
pub const E_USR: &str = "E_USR";
pub const E_GRP: &str = "E_GRP";
pub const E_GNAME: &str = "E_GNAME";
pub const E_FULL: &str = "E_FULL";
pub const ERR: &str = "ERR";

/// Maximum size of a single UDP request datagram (spec §4.3).
pub const MAX_REQUEST_UDP: usize = 128;

/// The 4-byte fixed header every TCP command starts with: 3 tag chars + a
/// trailing space (spec §4.3).
pub const TCP_TAG_LEN: usize = 4;

/// Cap on the number of messages a single `RTV` reply window returns.
pub const MAX_RETRIEVE_WINDOW: usize = 20;

/// Default DS listening port (spec §6 CLI surface).
pub const DEFAULT_PORT: u16 = 58012;
