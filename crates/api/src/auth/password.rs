//! Password hashing with bcrypt

/// Work factor for every password write path
pub const HASH_COST: u32 = 10;

/// Hash a password with a per-hash random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    bcrypt::hash(password, HASH_COST).map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "secret123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert_ne!(hash, password);
        assert!(verify_password(password, &hash).expect("Verification failed"));
        assert!(!verify_password("wrong_password", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_cost_factor_embedded() {
        let hash = hash_password("secret123").unwrap();
        // bcrypt encodes the cost in the hash prefix: $2b$10$...
        assert!(hash.starts_with("$2") && hash.contains("$10$"));
    }

    #[test]
    fn test_salted_hashes_differ() {
        let a = hash_password("secret123").unwrap();
        let b = hash_password("secret123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_rejected() {
        assert!(verify_password("secret123", "not-a-bcrypt-hash").is_err());
    }
}
