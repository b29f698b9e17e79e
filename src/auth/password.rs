/// Password Hashing and Verification
///
/// Stored hashes are bcrypt (salted, constant-time comparison).

use bcrypt::{hash, verify};

use crate::error::AppError;

/// Hash a password using bcrypt with the given cost
///
/// # Errors
/// Returns error if the cost is out of range or hashing fails
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// # Errors
/// Returns error if the stored hash is not a valid bcrypt hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Hash compared against when the email is unknown
///
/// Built at the same cost as the stored hashes so both login paths cost one
/// bcrypt run of equal work.
#[derive(Debug, Clone)]
pub struct DecoyHash {
    hash: Option<String>,
}

impl DecoyHash {
    pub fn new(cost: u32) -> Self {
        let hash = match hash("not-a-real-password", cost) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::warn!(cost, error = %e, "Could not build decoy password hash");
                None
            }
        };
        Self { hash }
    }

    /// Burn the same work as a real comparison; the result is discarded.
    pub fn verify(&self, password: &str) {
        if let Some(decoy) = &self.hash {
            let _ = verify(password, decoy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_password() {
        let password = "secret";
        let hash = hash_password(password, TEST_COST).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let first = hash_password("secret", TEST_COST).unwrap();
        let second = hash_password("secret", TEST_COST).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("secret", TEST_COST).expect("Failed to hash password");

        assert!(verify_password("secret", &hash).expect("Failed to verify password"));
        assert!(!verify_password("wrong", &hash).expect("Failed to verify password"));
    }

    #[test]
    fn test_verify_against_garbage_hash_errors() {
        assert!(verify_password("secret", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_decoy_matches_configured_cost() {
        let decoy = DecoyHash::new(TEST_COST);
        let stored = hash_password("secret", TEST_COST).unwrap();

        let decoy_hash = decoy.hash.as_deref().expect("Decoy hash missing");
        assert_eq!(&decoy_hash[..7], &stored[..7]);
        assert!(decoy_hash.starts_with("$2b$04$"));
    }

    #[test]
    fn test_decoy_with_invalid_cost_is_inert() {
        let decoy = DecoyHash::new(2);
        assert!(decoy.hash.is_none());
        decoy.verify("secret");
    }

    #[test]
    fn test_invalid_cost_errors() {
        assert!(hash_password("secret", 2).is_err());
    }
}
