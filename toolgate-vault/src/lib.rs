//! # Toolgate Vault
//!
//! Symmetric protection for stored backend credentials. With a configured
//! key the vault runs AES-256-GCM with a fresh random nonce per
//! encryption and keyed HMAC-SHA-256 hashing; without one it degrades to
//! an identity service so deployments that have not set `ENCRYPTION_KEY`
//! keep working with plaintext columns.
//!
//! Ciphertext layout is `hex(nonce ‖ ciphertext ‖ tag)` with a 12-byte
//! nonce, so every encryption of the same plaintext yields a distinct
//! string and a ciphertext produced under one key never decrypts under
//! another (the GCM tag check fails).

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// AES-GCM nonce length in bytes
const NONCE_LEN: usize = 12;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors produced by vault operations
#[derive(Debug, Error)]
pub enum VaultError {
    /// Ciphertext is not valid hex
    #[error("invalid hex: {details}")]
    InvalidHex { details: String },

    /// Decoded ciphertext is shorter than the nonce
    #[error("ciphertext too short: {len} bytes")]
    TooShort { len: usize },

    /// AES error or authentication tag mismatch
    #[error("decryption failed")]
    DecryptionFailed,
}

/// Symmetric-encryption provider protecting stored API keys
pub trait Vault: Send + Sync {
    /// Encrypt a plaintext into hex ciphertext
    fn encrypt(&self, plaintext: &str) -> VaultResult<String>;

    /// Decrypt hex ciphertext back into the plaintext
    fn decrypt(&self, ciphertext: &str) -> VaultResult<String>;

    /// Deterministic keyed digest; the empty string maps to the empty
    /// string by convention (used to recognise "no secret set")
    fn hash(&self, input: &str) -> String;
}

/// Build the vault matching the configured key: AES-GCM when a key is
/// set, identity otherwise.
pub fn from_key(key: &str) -> Box<dyn Vault> {
    if key.is_empty() {
        Box::new(IdentityVault)
    } else {
        Box::new(AesGcmVault::new(key))
    }
}

/// Mask a credential for log output: first four characters plus `***`
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let prefix: String = key.chars().take(4).collect();
    format!("{}***", prefix)
}

/// AES-256-GCM vault with HMAC-SHA-256 hashing
pub struct AesGcmVault {
    key: [u8; 32],
}

impl AesGcmVault {
    /// Derive the 32-byte key from the configured string: used verbatim
    /// when it is exactly 32 bytes, hashed with SHA-256 otherwise.
    pub fn new(key: &str) -> Self {
        let bytes = key.as_bytes();
        let key = if bytes.len() == 32 {
            let mut k = [0u8; 32];
            k.copy_from_slice(bytes);
            k
        } else {
            let digest = Sha256::digest(bytes);
            let mut k = [0u8; 32];
            k.copy_from_slice(&digest);
            k
        };
        Self { key }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(&self.key))
    }
}

impl Vault for AesGcmVault {
    fn encrypt(&self, plaintext: &str) -> VaultResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::DecryptionFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    fn decrypt(&self, ciphertext: &str) -> VaultResult<String> {
        let raw = hex::decode(ciphertext).map_err(|e| VaultError::InvalidHex {
            details: e.to_string(),
        })?;
        if raw.len() < NONCE_LEN {
            return Err(VaultError::TooShort { len: raw.len() });
        }
        let (nonce_bytes, payload) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher()
            .decrypt(nonce, payload)
            .map_err(|_| VaultError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|_| VaultError::DecryptionFailed)
    }

    fn hash(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(input.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Identity vault used when no encryption key is configured
pub struct IdentityVault;

impl Vault for IdentityVault {
    fn encrypt(&self, plaintext: &str) -> VaultResult<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> VaultResult<String> {
        Ok(ciphertext.to_string())
    }

    fn hash(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }
        hex::encode(Sha256::digest(input.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let vault = AesGcmVault::new("test-key");
        for plaintext in ["", "secret", "日本語のテキスト", &"x".repeat(4096)] {
            let ct = vault.encrypt(plaintext).unwrap();
            assert_eq!(vault.decrypt(&ct).unwrap(), plaintext);
            if !plaintext.is_empty() {
                assert_ne!(ct, plaintext);
            }
        }
    }

    #[test]
    fn test_nonce_randomness() {
        let vault = AesGcmVault::new("test-key");
        let a = vault.encrypt("same").unwrap();
        let b = vault.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_cross_key_decryption_fails() {
        let a = AesGcmVault::new("key-a");
        let b = AesGcmVault::new("key-b");
        let ct = a.encrypt("secret").unwrap();
        assert!(matches!(b.decrypt(&ct), Err(VaultError::DecryptionFailed)));
    }

    #[test]
    fn test_decrypt_error_classification() {
        let vault = AesGcmVault::new("test-key");
        assert!(matches!(
            vault.decrypt("zz-not-hex"),
            Err(VaultError::InvalidHex { .. })
        ));
        assert!(matches!(
            vault.decrypt("00ff"),
            Err(VaultError::TooShort { .. })
        ));
        // Valid hex, long enough, corrupted tag
        let mut ct = vault.encrypt("secret").unwrap();
        let tail = ct.split_off(ct.len() - 2);
        ct.push_str(if tail == "00" { "01" } else { "00" });
        assert!(matches!(
            vault.decrypt(&ct),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_hmac_determinism() {
        let a1 = AesGcmVault::new("key-a");
        let a2 = AesGcmVault::new("key-a");
        let b = AesGcmVault::new("key-b");
        assert_eq!(a1.hash("value"), a2.hash("value"));
        assert_ne!(a1.hash("value"), b.hash("value"));
        assert_eq!(a1.hash(""), "");
    }

    #[test]
    fn test_identity_mode() {
        let vault = from_key("");
        assert_eq!(vault.encrypt("p").unwrap(), "p");
        assert_eq!(vault.decrypt("p").unwrap(), "p");
        assert_eq!(vault.hash(""), "");
        let digest = vault.hash("p");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_raw_32_byte_key_used_verbatim() {
        let key = "0123456789abcdef0123456789abcdef";
        let a = AesGcmVault::new(key);
        let ct = a.encrypt("secret").unwrap();
        let b = AesGcmVault::new(key);
        assert_eq!(b.decrypt(&ct).unwrap(), "secret");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-1234567890"), "sk-1***");
        assert_eq!(mask_key("ab"), "ab***");
        assert_eq!(mask_key(""), "");
    }
}
