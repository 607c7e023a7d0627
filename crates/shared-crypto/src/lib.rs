//! # Shared Crypto - Envelope Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | AES-128-CBC, PKCS#7 | Message body decryption |
//! | `certificate` | PEM-armoured public keys | Signing certificate resolution |
//! | `signatures` | Ed25519 | Message signature verification |
//! | `ecdsa` | secp256k1 | Message signature verification |
//! | `hashing` | SHA-256 | Artifact digests, row fingerprints |
//!
//! ## Security Properties
//!
//! - **AES-CBC**: padding is checked on decrypt; a wrong key surfaces as
//!   `DecryptionFailed` or as garbage the caller must reject.
//! - **Ed25519**: deterministic nonces, strict point validation on load.
//! - **secp256k1**: compressed and uncompressed SEC1 keys, `r||s` or DER
//!   signatures.

#![warn(clippy::all)]

pub mod certificate;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod signatures;
pub mod symmetric;

pub use certificate::SigningCertificate;
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey};
pub use errors::CryptoError;
pub use hashing::{sha256_hex, Sha256Hasher};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey};
pub use symmetric::{decode_base64, decrypt_aes128_cbc, encrypt_aes128_cbc, AesKey, Iv};
