//! Tag and hardware identifier rules
//!
//! Pure functions over randomness only. The UID format gates wizard step
//! advancement and classifies incoming scan UIDs as usable.

use rand::Rng;

/// Alphabet for generated tag identifiers
const TAG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
/// Plain UID length
const TAG_UID_LEN: usize = 10;
/// Prefixed UID form: `TAG_` followed by this many alphabet chars
const TAG_PREFIX: &str = "TAG_";
const TAG_SUFFIX_LEN: usize = 8;
/// Octet count of a simulated hardware identifier
const HARDWARE_UID_OCTETS: usize = 7;

fn is_tag_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Whether `uid` is a usable tag identifier.
///
/// Accepts exactly 10 characters of `[a-z0-9]`, or the literal prefix
/// `TAG_` followed by 8 characters of `[a-z0-9]`.
pub fn is_valid_tag_uid(uid: &str) -> bool {
    if let Some(suffix) = uid.strip_prefix(TAG_PREFIX) {
        return suffix.len() == TAG_SUFFIX_LEN && suffix.chars().all(is_tag_char);
    }
    uid.len() == TAG_UID_LEN && uid.chars().all(is_tag_char)
}

/// Generate a 10-character tag identifier uniformly over `[a-z0-9]`.
///
/// Valid by construction: `is_valid_tag_uid(&generate_tag_id())` always
/// holds.
pub fn generate_tag_id() -> String {
    let mut rng = rand::thread_rng();
    (0..TAG_UID_LEN)
        .map(|_| TAG_ALPHABET[rng.gen_range(0..TAG_ALPHABET.len())] as char)
        .collect()
}

/// Generate a simulated low-level reader identifier: 7 random bytes as
/// uppercase two-digit hex octets joined by `:` (e.g. `A1:00:FF:...`).
///
/// Cosmetic/diagnostic only, never used for identity comparison.
pub fn generate_hardware_uid() -> String {
    let mut rng = rand::thread_rng();
    (0..HARDWARE_UID_OCTETS)
        .map(|_| format!("{:02X}", rng.gen::<u8>()))
        .collect::<Vec<_>>()
        .join(":")
}
