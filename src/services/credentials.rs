use rand::Rng;
use scrypt::{scrypt, Params};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Length in bytes of the derived key.
pub const KEY_LENGTH: usize = 64;

/// Random bytes per salt; stored hex-encoded, so 32 characters.
const SALT_BYTES: usize = 16;

/// scrypt cost matching the common N=16384, r=8, p=1 default.
pub const DEFAULT_LOG_N: u8 = 14;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("invalid scrypt parameters: {0}")]
    InvalidParams(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error("hashing task failed: {0}")]
    Task(String),
}

/// Salted scrypt password hashing.
///
/// Stored values look like `hex(derived_key).salt`, where `salt` is the
/// hex string of 16 random bytes and is fed to scrypt as-is.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Creates a hasher with cost `2^log_n`, r=8, p=1.
    pub fn new(log_n: u8) -> Result<Self, CredentialError> {
        let params = Params::new(log_n, 8, 1, KEY_LENGTH)
            .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    /// Hashes `password` under a fresh salt, so repeated calls differ.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt_bytes: [u8; SALT_BYTES] = rand::rng().random();
        let salt = hex::encode(salt_bytes);

        let mut derived = [0u8; KEY_LENGTH];
        scrypt(password.as_bytes(), salt.as_bytes(), &self.params, &mut derived)
            .map_err(|e| CredentialError::Derivation(e.to_string()))?;

        Ok(format!("{}.{}", hex::encode(derived), salt))
    }

    /// Checks `supplied` against a stored hash in constant time.
    ///
    /// Malformed stored values never match.
    pub fn verify(&self, supplied: &str, stored: &str) -> bool {
        let Some((key_hex, salt)) = stored.split_once('.') else {
            return false;
        };
        if salt.is_empty() {
            return false;
        }
        let Ok(expected) = hex::decode(key_hex) else {
            return false;
        };
        if expected.len() != KEY_LENGTH {
            return false;
        }

        let mut derived = [0u8; KEY_LENGTH];
        if scrypt(supplied.as_bytes(), salt.as_bytes(), &self.params, &mut derived).is_err() {
            return false;
        }

        derived.ct_eq(expected.as_slice()).into()
    }

    /// [`Self::hash`] on the blocking pool; scrypt is deliberately slow.
    pub async fn hash_password(&self, password: String) -> Result<String, CredentialError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| CredentialError::Task(e.to_string()))?
    }

    /// [`Self::verify`] on the blocking pool.
    pub async fn verify_password(&self, supplied: String, stored: String) -> bool {
        let hasher = *self;
        match tokio::task::spawn_blocking(move || hasher.verify(&supplied, &stored)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!("Password verification task failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap cost keeps the suite fast; the format is unaffected.
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = hasher();
        for password in ["secret1", "correct horse battery staple", "पासवर्ड", ""] {
            let stored = hasher.hash(password).unwrap();
            assert!(hasher.verify(password, &stored), "{password}");
        }
    }

    #[test]
    fn test_hash_format() {
        let stored = hasher().hash("secret1").unwrap();
        let (key, salt) = stored.split_once('.').unwrap();
        assert_eq!(key.len(), KEY_LENGTH * 2);
        assert_eq!(salt.len(), SALT_BYTES * 2);
        assert!(stored.chars().all(|c| c == '.' || c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let hasher = hasher();
        let first = hasher.hash("secret1").unwrap();
        let second = hasher.hash("secret1").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify("secret1", &first));
        assert!(hasher.verify("secret1", &second));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let hasher = hasher();
        let stored = hasher.hash("secret1").unwrap();
        assert!(!hasher.verify("secret2", &stored));
        assert!(!hasher.verify("Secret1", &stored));
    }

    #[test]
    fn test_malformed_stored_value_fails_closed() {
        let hasher = hasher();
        let stored = hasher.hash("secret1").unwrap();
        let (key, _) = stored.split_once('.').unwrap();

        let malformed = [
            String::new(),
            "no-separator".to_string(),
            format!("{}.", key),
            format!("zz{}.abcd", &key[2..]),
            format!("{}.abcd", &key[..10]),
            ".abcd".to_string(),
        ];
        for stored in malformed {
            assert!(!hasher.verify("secret1", &stored), "{stored:?}");
        }
    }

    #[test]
    fn test_cost_must_match() {
        let stored = PasswordHasher::new(5).unwrap().hash("secret1").unwrap();
        assert!(!hasher().verify("secret1", &stored));
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let hasher = hasher();
        let stored = hasher.hash_password("secret1".into()).await.unwrap();
        assert!(hasher.verify_password("secret1".into(), stored.clone()).await);
        assert!(!hasher.verify_password("nope".into(), stored).await);
    }
}
