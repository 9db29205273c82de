//! Tagged identifier types (spec §9, "stringly-typed identifiers").
//!
//! Each constructor runs the matching validator from [`crate::validate`] and
//! is the only way to obtain an instance, so once a handler holds a `Uid` it
//! never needs to re-check "is this a UID?" again.

use crate::validate;
use std::fmt;

macro_rules! validated_string_type {
    ($name:ident, $validator:path, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn parse(s: &str) -> Option<Self> {
                if $validator(s) {
                    Some(Self(s.to_owned()))
                } else {
                    None
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

validated_string_type!(Uid, validate::is_uid, "A 5-digit decimal user identifier.");
validated_string_type!(Pass, validate::is_pass, "An 8-character alphanumeric password.");
validated_string_type!(
    GName,
    validate::is_gname,
    "A group name: 1-24 chars from [A-Za-z0-9_-]."
);
validated_string_type!(
    Fname,
    validate::is_fname,
    "An attachment filename matching [A-Za-z0-9_.-]{1,20}\\.[A-Za-z]{3}."
);

/// A 2-digit group identifier in `00..=99`. `00` is the reserved
/// create-group sentinel (spec invariant 5) and is never itself the id of a
/// stored group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gid(u8);

impl Gid {
    pub const CREATE: Gid = Gid(0);
    pub const MIN_STORED: u8 = 1;
    pub const MAX_STORED: u8 = 99;

    pub fn parse(s: &str) -> Option<Self> {
        if !validate::is_gid(s) {
            return None;
        }
        s.parse::<u8>().ok().map(Gid)
    }

    pub fn from_stored(n: u8) -> Option<Self> {
        if (Self::MIN_STORED..=Self::MAX_STORED).contains(&n) {
            Some(Gid(n))
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_create_sentinel(&self) -> bool {
        self.0 == 0
    }

    /// All group ids a stored group may occupy, `01..=99`, ascending.
    pub fn all_stored() -> impl Iterator<Item = Gid> {
        (Self::MIN_STORED..=Self::MAX_STORED).map(Gid)
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// A message identifier, dense per group starting at `0001`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mid(u32);

impl Mid {
    pub const FIRST: Mid = Mid(1);

    pub fn parse(s: &str) -> Option<Self> {
        if !validate::is_mid(s) {
            return None;
        }
        s.parse::<u32>().ok().map(Mid)
    }

    pub fn from_count(n: u32) -> Option<Self> {
        if (1..=9999).contains(&n) { Some(Mid(n)) } else { None }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn next(&self) -> Mid {
        Mid(self.0 + 1)
    }
}

impl fmt::Display for Mid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// A validated text length in `1..=240`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tsize(usize);

impl Tsize {
    pub fn parse(s: &str) -> Option<Self> {
        if !validate::is_tsize(s) {
            return None;
        }
        s.parse::<usize>().ok().map(Tsize)
    }

    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Tsize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated attachment byte length, `0..=9_999_999_999`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fsize(u64);

impl Fsize {
    pub fn parse(s: &str) -> Option<Self> {
        if !validate::is_fsize(s) {
            return None;
        }
        s.parse::<u64>().ok().map(Fsize)
    }

    pub fn from_len(n: u64) -> Option<Self> {
        Fsize::parse(&n.to_string())
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fsize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gid_sentinel_vs_stored() {
        let zero = Gid::parse("00").unwrap();
        assert!(zero.is_create_sentinel());
        assert!(Gid::from_stored(0).is_none());
        assert!(Gid::from_stored(1).is_some());
        assert_eq!(Gid::parse("07").unwrap().to_string(), "07");
    }

    #[test]
    fn mid_display_zero_padded() {
        let mid = Mid::from_count(7).unwrap();
        assert_eq!(mid.to_string(), "0007");
        assert_eq!(mid.next().to_string(), "0008");
    }

    #[test]
    fn rejects_malformed() {
        assert!(Uid::parse("1").is_none());
        assert!(Pass::parse("short").is_none());
        assert!(GName::parse("").is_none());
        assert!(Fname::parse("noext").is_none());
    }
}
