//! Password hashing, thin wrapper over bcrypt.

/// Hash a plaintext password for storage.
pub fn hash_password(plain: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
}

/// Check a candidate plaintext against a stored hash. Malformed hashes count
/// as a mismatch.
pub fn verify_password(hash: &str, candidate: &str) -> bool {
    bcrypt::verify(candidate, hash).unwrap_or(false)
}
