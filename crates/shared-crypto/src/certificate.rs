//! # Signing Certificates
//!
//! Message headers name the certificate that signed them by URL. The
//! document behind that URL is a PEM-armoured public key:
//!
//! ```text
//! -----BEGIN PUBLIC KEY-----
//! <base64 key bytes>
//! -----END PUBLIC KEY-----
//! ```
//!
//! | Decoded length | Algorithm |
//! |----------------|-----------|
//! | 32 | Ed25519 |
//! | 33 / 65 | secp256k1 (SEC1) |

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::ecdsa::Secp256k1PublicKey;
use crate::signatures::Ed25519PublicKey;
use crate::symmetric::decode_base64;
use crate::CryptoError;

const PEM_BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_END: &str = "-----END PUBLIC KEY-----";

/// A parsed signing certificate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigningCertificate {
    /// Ed25519 verifying key.
    Ed25519(Ed25519PublicKey),
    /// secp256k1 verifying key.
    Secp256k1(Secp256k1PublicKey),
}

impl SigningCertificate {
    /// Parse a PEM document. Armour lines are optional.
    pub fn from_pem(text: &str) -> Result<Self, CryptoError> {
        let body: String = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("-----"))
            .collect();
        if body.is_empty() {
            return Err(CryptoError::InvalidCertificate("empty certificate".into()));
        }
        let bytes = decode_base64(&body)
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
        Self::from_key_bytes(&bytes)
    }

    /// Pick the algorithm from the raw key length.
    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        match bytes.len() {
            32 => {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(bytes);
                Ok(Self::Ed25519(Ed25519PublicKey::from_bytes(&arr)?))
            }
            33 | 65 => Ok(Self::Secp256k1(Secp256k1PublicKey::from_sec1_bytes(bytes)?)),
            n => Err(CryptoError::InvalidCertificate(format!(
                "unsupported key length {n}"
            ))),
        }
    }

    /// Render as PEM.
    pub fn to_pem(&self) -> String {
        let encoded = match self {
            Self::Ed25519(k) => STANDARD.encode(k.to_bytes()),
            Self::Secp256k1(k) => STANDARD.encode(k.to_sec1_bytes()),
        };
        format!("{PEM_BEGIN}\n{encoded}\n{PEM_END}\n")
    }

    /// Short algorithm name for logs.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Ed25519(_) => "ed25519",
            Self::Secp256k1(_) => "secp256k1",
        }
    }

    /// Verify `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        match self {
            Self::Ed25519(key) => key.verify(message, signature),
            Self::Secp256k1(key) => key.verify(message, signature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ed25519KeyPair, Secp256k1KeyPair};

    #[test]
    fn test_ed25519_pem_roundtrip_and_verify() {
        let keypair = Ed25519KeyPair::from_seed([3u8; 32]);
        let pem = SigningCertificate::Ed25519(keypair.public_key()).to_pem();

        let cert = SigningCertificate::from_pem(&pem).unwrap();
        assert_eq!(cert.algorithm(), "ed25519");

        let sig = keypair.sign(b"payload");
        assert!(cert.verify(b"payload", &sig).is_ok());
        assert!(cert.verify(b"payload!", &sig).is_err());
    }

    #[test]
    fn test_secp256k1_pem_verify() {
        let keypair = Secp256k1KeyPair::from_bytes([9u8; 32]).unwrap();
        let pem = SigningCertificate::Secp256k1(keypair.public_key()).to_pem();

        let cert = SigningCertificate::from_pem(&pem).unwrap();
        let sig = keypair.sign(b"payload");
        assert!(cert.verify(b"payload", &sig).is_ok());
    }

    #[test]
    fn test_bad_documents_rejected() {
        assert!(SigningCertificate::from_pem("").is_err());
        assert!(SigningCertificate::from_pem("-----BEGIN PUBLIC KEY-----\n%%%\n").is_err());
        let short = STANDARD.encode([1u8; 20]);
        assert!(matches!(
            SigningCertificate::from_pem(&short),
            Err(CryptoError::InvalidCertificate(_))
        ));
    }
}
