use bcrypt::{hash, verify, DEFAULT_COST};

use crate::errors::{AppError, Result};

/// One-way hashing for account passwords and OTP codes. bcrypt salts per
/// call, so two hashes of the same input never compare equal as strings;
/// only `verify` can match them. Stateless and safe to share across
/// concurrent requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        hash(plaintext, DEFAULT_COST).map_err(|_| AppError::Hashing)
    }

    pub fn verify(&self, plaintext: &str, digest: &str) -> Result<bool> {
        verify(plaintext, digest).map_err(|_| AppError::Hashing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hasher = PasswordHasher;
        let digest = hasher.hash("secret1").unwrap();

        assert_ne!(digest, "secret1");
        assert!(hasher.verify("secret1", &digest).unwrap());
        assert!(!hasher.verify("secret2", &digest).unwrap());
    }

    #[test]
    fn same_input_hashes_differently() {
        let hasher = PasswordHasher;
        let a = hasher.hash("1234").unwrap();
        let b = hasher.hash("1234").unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify("1234", &a).unwrap());
        assert!(hasher.verify("1234", &b).unwrap());
    }
}
