//! ICE-safe random string and transaction id generation.
//!
//! Generalizes the teacher crate's `rand/mod.rs`: that module only ever needed
//! ufrag/pwd generation. This core additionally needs foundation-safe
//! candidate ids, 64-bit tie-breakers and 12-byte STUN transaction ids, so the
//! alphabet and length constants are parameterized per RFC 5245 §15.1 / §3.

use rand::{thread_rng, Rng as _};

/// `ice-char = ALPHA / DIGIT / "+" / "/"`, RFC 5245 §15.1.
const ICE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+/";

/// RFC 8445 recommends ufrag >= 24 bits (4 chars) and pwd >= 128 bits (22
/// chars) of entropy; this implementation standardizes on 22-char credentials
/// for both, comfortably above the floor, to keep invariants simple.
pub const CREDENTIAL_LEN: usize = 22;

/// Generates a string of `n` characters drawn from the ICE-safe alphabet.
pub fn ice_safe_string(n: usize) -> String {
    let mut rng = thread_rng();
    (0..n)
        .map(|_| ICE_CHARS[rng.gen_range(0..ICE_CHARS.len())] as char)
        .collect()
}

/// Generates a local username fragment.
pub fn generate_ufrag() -> String {
    ice_safe_string(CREDENTIAL_LEN)
}

/// Generates a local password.
pub fn generate_pwd() -> String {
    ice_safe_string(CREDENTIAL_LEN)
}

/// Generates a fresh 64-bit tie-breaker used to resolve ICE role conflicts.
pub fn generate_tie_breaker() -> u64 {
    thread_rng().gen()
}

#[cfg(test)]
mod rand_test {
    use super::*;

    #[test]
    fn test_ice_safe_string_alphabet_and_length() {
        let s = ice_safe_string(32);
        assert_eq!(s.chars().count(), 32);
        assert!(s.bytes().all(|b| ICE_CHARS.contains(&b)));
    }

    #[test]
    fn test_credentials_meet_rfc8445_floor() {
        // ufrag >= 4 chars (24 bits), pwd >= 22 chars (128 bits)
        assert!(generate_ufrag().len() >= 4);
        assert!(generate_pwd().len() >= 22);
    }

}
