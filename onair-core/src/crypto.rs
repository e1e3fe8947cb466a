use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

/// Keyed hashing for installation secrets.
///
/// Secrets are stored as a hex HMAC-SHA-256 digest keyed with the configured
/// license secret key; verification compares digests in constant time.
#[derive(Debug)]
pub struct SecretHasher {
    key: Zeroizing<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum SecretHasherError {
    #[error("license secret key must not be empty")]
    EmptyKey,
}

impl SecretHasher {
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, SecretHasherError> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(SecretHasherError::EmptyKey);
        }
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
        })
    }

    pub fn hash_secret(&self, secret: &str) -> String {
        type HmacSha256 = Hmac<Sha256>;

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .expect("HMAC-SHA-256 accepts keys of any size");
        mac.update(secret.as_bytes());

        hex::encode(mac.finalize().into_bytes())
    }

    pub fn verify_secret(&self, secret: &str, stored_hash: &str) -> bool {
        let candidate = self.hash_secret(secret);
        constant_time_eq::constant_time_eq(
            candidate.as_bytes(),
            stored_hash.as_bytes(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            SecretHasher::new(""),
            Err(SecretHasherError::EmptyKey)
        ));
    }

    #[test]
    fn hashing_is_keyed_and_deterministic() {
        let first = SecretHasher::new("key-a").unwrap();
        let second = SecretHasher::new("key-b").unwrap();

        let digest = first.hash_secret("s3cr3t");
        assert_eq!(digest, first.hash_secret("s3cr3t"));
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, second.hash_secret("s3cr3t"));
    }

    #[test]
    fn verify_matches_only_the_original_secret() {
        let hasher = SecretHasher::new("key").unwrap();
        let stored = hasher.hash_secret("s3cr3t");
        assert!(hasher.verify_secret("s3cr3t", &stored));
        assert!(!hasher.verify_secret("S3cr3t", &stored));
    }
}
