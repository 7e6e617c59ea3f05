/// Hash a plaintext password with bcrypt. The cost is fixed at the library
/// default and is not configurable.
pub fn hash_password(plain: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
}

/// Verify plaintext against a stored hash - constant-time via bcrypt.
/// A malformed hash counts as a mismatch.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}
