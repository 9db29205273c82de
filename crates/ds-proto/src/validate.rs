//! Pure validators for each field kind in the wire grammar (spec §3, §4.1).
//!
//! These never allocate beyond what the caller already holds; they only
//! inspect bytes. All of them treat their input as the *entire* field (no
//! partial matches), matching how each is used: once a word has been framed
//! by the streaming reader, it is checked in full.

pub const MAX_TEXT: usize = 240;
pub const MAX_FNAME: usize = 20;
pub const MAX_GNAME: usize = 24;
pub const MAX_GROUPS: u8 = 99;

pub fn is_uid(s: &str) -> bool {
    s.len() == 5 && s.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_pass(s: &str) -> bool {
    s.len() == 8 && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Accepts any syntactically well-formed 2-digit GID, including the `00`
/// create-group sentinel. Whether `00` is acceptable in a given context is
/// a domain decision made by the caller, not this validator.
pub fn is_gid(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_gname(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_GNAME
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub fn is_mid(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

/// `[A-Za-z0-9_.-]{1,20}\.[A-Za-z]{3}`: a 1-20 char base (itself allowed to
/// contain `.`) followed by a literal `.` and a 3-letter extension.
pub fn is_fname(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 1 + 1 + 3 {
        return false;
    }
    let ext_start = bytes.len() - 3;
    if bytes[ext_start - 1] != b'.' {
        return false;
    }
    let ext = &s[ext_start..];
    if !ext.bytes().all(|b| b.is_ascii_alphabetic()) {
        return false;
    }
    let base = &s[..ext_start - 1];
    !base.is_empty()
        && base.len() <= MAX_FNAME
        && base
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
}

/// A declared `Tsize` word: 1-3 decimal digits encoding a value in `1..=240`.
pub fn is_tsize(s: &str) -> bool {
    (1..=3).contains(&s.len())
        && s.bytes().all(|b| b.is_ascii_digit())
        && s.parse::<usize>()
            .is_ok_and(|n| (1..=MAX_TEXT).contains(&n))
}

/// A declared `Fsize` word: 1-10 decimal digits.
pub fn is_fsize(s: &str) -> bool {
    (1..=10).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Text payload bytes once read: any non-empty byte string up to `MAX_TEXT`.
pub fn is_text(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.len() <= MAX_TEXT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_boundaries() {
        assert!(is_uid("10000"));
        assert!(!is_uid("1000"));
        assert!(!is_uid("100000"));
        assert!(!is_uid("1000a"));
    }

    #[test]
    fn pass_exact_length() {
        assert!(is_pass("abcdefgh"));
        assert!(!is_pass("abcdefg"));
        assert!(!is_pass("abcdefg!"));
    }

    #[test]
    fn gid_sentinel_is_syntactically_valid() {
        assert!(is_gid("00"));
        assert!(is_gid("01"));
        assert!(is_gid("99"));
        assert!(!is_gid("100"));
        assert!(!is_gid("1"));
    }

    #[test]
    fn gname_charset_and_length() {
        assert!(is_gname("demo"));
        assert!(is_gname("a"));
        assert!(is_gname(&"a".repeat(24)));
        assert!(!is_gname(&"a".repeat(25)));
        assert!(!is_gname(""));
        assert!(!is_gname("has space"));
    }

    #[test]
    fn mid_is_four_digits() {
        assert!(is_mid("0001"));
        assert!(!is_mid("1"));
        assert!(!is_mid("00001"));
    }

    #[test]
    fn fname_requires_three_letter_extension() {
        assert!(is_fname("a.txt"));
        assert!(is_fname("my-file_1.png"));
        assert!(!is_fname("a.tx"));
        assert!(!is_fname("a.text"));
        assert!(!is_fname(".txt"));
        assert!(!is_fname(&format!("{}.txt", "a".repeat(21))));
    }

    #[test]
    fn tsize_bounds() {
        assert!(is_tsize("1"));
        assert!(is_tsize("240"));
        assert!(!is_tsize("0"));
        assert!(!is_tsize("241"));
        assert!(!is_tsize("1000"));
    }

    #[test]
    fn fsize_bounds() {
        assert!(is_fsize("0"));
        assert!(is_fsize("9999999999"));
        assert!(!is_fsize("10000000000"));
    }
}
