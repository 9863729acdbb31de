use rand::distributions::Alphanumeric;
use rand::Rng;

const ACCESS_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default length of generated access codes
pub const ACCESS_CODE_LENGTH: usize = 8;

/// Generate a random access code from `A-Z0-9`
pub fn generate_access_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ACCESS_CODE_ALPHABET[rng.gen_range(0..ACCESS_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form of a user-typed access code
#[inline]
pub fn normalize_access_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Generate an opaque participant id: `participant_<millis>_<6 base36 chars>`
pub fn generate_participant_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|b| (b as char).to_ascii_lowercase())
        .take(6)
        .collect();
    format!("participant_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}
