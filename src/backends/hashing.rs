use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::accounts::CredentialError;

/// Cost profile for password hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashStrength {
    /// Argon2id defaults: 19 MiB, 2 iterations
    #[default]
    Standard,
    /// 1 MiB, 1 iteration. Only for test suites.
    Minimal,
}

/// Hashes and verifies passwords with Argon2id
#[derive(Debug, Clone, Default)]
pub struct PasswordHashing {
    strength: HashStrength,
}

impl PasswordHashing {
    pub fn new(strength: HashStrength) -> Self {
        Self { strength }
    }

    fn argon2(&self) -> Result<Argon2<'static>, CredentialError> {
        match self.strength {
            HashStrength::Standard => Ok(Argon2::default()),
            HashStrength::Minimal => {
                let params = Params::new(1024, 1, 1, None).map_err(|e| CredentialError::Hashing {
                    message: e.to_string(),
                })?;
                Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
            }
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing {
                message: e.to_string(),
            })
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, CredentialError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| CredentialError::Hashing {
            message: e.to_string(),
        })?;
        // Parameters come from the stored hash, so either strength verifies
        Ok(self
            .argon2()?
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hashing = PasswordHashing::new(HashStrength::Minimal);
        let hash = hashing.hash("forehand").unwrap();
        assert!(hash.starts_with("$argon2id"));

        assert!(hashing.verify("forehand", &hash).unwrap());
        assert!(!hashing.verify("backhand", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hashing = PasswordHashing::new(HashStrength::Minimal);
        let first = hashing.hash("serve").unwrap();
        let second = hashing.hash("serve").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let hashing = PasswordHashing::new(HashStrength::Minimal);
        assert!(hashing.verify("serve", "not-a-hash").is_err());
    }
}
