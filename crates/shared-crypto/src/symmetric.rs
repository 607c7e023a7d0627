//! # Symmetric Decryption
//!
//! AES-128-CBC with PKCS#7 padding, the cipher used for encrypted message
//! bodies. Keys and IVs arrive base64-encoded from the key service and the
//! message header.
//!
//! ## Security Properties
//!
//! - **Padding check**: a malformed final block fails with `DecryptionFailed`.
//! - **No authentication**: CBC does not detect a wrong key reliably. The
//!   caller must validate the plaintext shape.

use crate::CryptoError;
use aes::Aes128;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::fmt;
use zeroize::Zeroize;

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

/// AES block size, which is also the IV length.
pub const BLOCK_LEN: usize = 16;

/// Secret key (128-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct AesKey([u8; 16]);

impl AesKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Decode from base64 key material.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        Self::from_slice(&decode_base64(encoded)?)
    }

    /// Generate random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Base64 form, as served by the key service.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesKey(..)")
    }
}

/// CBC initialisation vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Iv([u8; BLOCK_LEN]);

impl Iv {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; BLOCK_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; BLOCK_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidIvLength {
                expected: BLOCK_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Decode from the base64 `IV` header.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        Self::from_slice(&decode_base64(encoded)?)
    }

    /// Generate random IV.
    pub fn generate() -> Self {
        let mut bytes = [0u8; BLOCK_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; BLOCK_LEN] {
        &self.0
    }

    /// Base64 form, as carried in message headers.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

/// Decode standard base64, ignoring surrounding whitespace.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}

/// Decrypt AES-128-CBC ciphertext and strip PKCS#7 padding.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` for empty or unaligned input and
/// for invalid padding.
pub fn decrypt_aes128_cbc(key: &AesKey, iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::DecryptionFailed(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_LEN
        )));
    }

    Aes128CbcDec::new(key.as_bytes().into(), iv.as_bytes().into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed("invalid padding".into()))
}

/// Encrypt with AES-128-CBC and PKCS#7 padding.
pub fn encrypt_aes128_cbc(key: &AesKey, iv: &Iv, plaintext: &[u8]) -> Vec<u8> {
    Aes128CbcEnc::new(key.as_bytes().into(), iv.as_bytes().into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = AesKey::generate();
        let iv = Iv::generate();
        let plaintext = br#"{"Events": []}"#;

        let ciphertext = encrypt_aes128_cbc(&key, &iv, plaintext);
        assert_eq!(ciphertext.len() % BLOCK_LEN, 0);

        let decrypted = decrypt_aes128_cbc(&key, &iv, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_key_does_not_yield_plaintext() {
        let key1 = AesKey::from_bytes([1u8; 16]);
        let key2 = AesKey::from_bytes([2u8; 16]);
        let iv = Iv::from_bytes([0u8; 16]);
        let plaintext = br#"{"Current": null}"#;

        let ciphertext = encrypt_aes128_cbc(&key1, &iv, plaintext);
        match decrypt_aes128_cbc(&key2, &iv, &ciphertext) {
            Ok(bytes) => assert_ne!(bytes, plaintext),
            Err(e) => assert!(matches!(e, CryptoError::DecryptionFailed(_))),
        }
    }

    #[test]
    fn test_unaligned_ciphertext_rejected() {
        let key = AesKey::generate();
        let iv = Iv::generate();
        let result = decrypt_aes128_cbc(&key, &iv, &[0u8; 15]);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_key_length_checked() {
        let err = AesKey::from_slice(&[0u8; 32]).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 16,
                actual: 32
            }
        ));
    }

    #[test]
    fn test_base64_roundtrip_of_key_material() {
        let key = AesKey::generate();
        let restored = AesKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.as_bytes(), restored.as_bytes());
        assert!(Iv::from_base64("not base64!").is_err());
    }
}
