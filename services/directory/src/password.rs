//! Password hashing
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 digests with a per-user
//! random salt. Both the salt and the digest are hex-encoded strings in
//! the aggregate document.

use pbkdf2::pbkdf2_hmac;
use rand::{Rng, RngCore, distributions::Alphanumeric};
use sha2::Sha256;

/// PBKDF2 iteration count
pub const ITERATIONS: u32 = 100_000;

const SALT_BYTES: usize = 16;
const DIGEST_BYTES: usize = 32;

/// Generate a new random salt, hex-encoded
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Derive the hex digest for a password and a hex-encoded salt
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = [0u8; DIGEST_BYTES];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), ITERATIONS, &mut digest);
    hex::encode(digest)
}

/// Check a password against a stored salt and digest
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

/// Generate a random alphanumeric password, used for first-run seeding
pub fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
