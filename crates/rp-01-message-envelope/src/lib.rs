//! # Message Envelope Subsystem (RP-01)
//!
//! Turns a raw queue message into a trusted, readable payload, independent
//! of what the payload means.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): envelope model, canonical signing strings,
//!   lenient JSON salvage. No I/O.
//! - **Ports Layer** (`ports/`): `EnvelopeApi` (inbound), `KeyService`,
//!   `KeyMaterialSource` and `CertificateSource` (outbound).
//! - **Service Layer** (`service.rs`): `EnvelopeProcessor`.
//! - **Adapters** (`adapters/`): current-key cache, in-memory sources.
//!
//! ## Flow
//!
//! ```text
//! raw JSON -> Envelope::parse -> validate(profile) -> ValidatedEnvelope
//!                                   |  type/version check
//!                                   |  canonical string + certificate
//!                                   v
//!                               decrypt -> PlainBody::{Json, Empty}
//! ```
//!
//! ## Key Resolution
//!
//! | Header | Key source |
//! |--------|-----------|
//! | `KeyURL` | fetched by URL |
//! | `KeyId` | fetched by id |
//! | neither | cached current key for the message type, refreshed once if stale |
//!
//! A `ValidatedEnvelope` can only be obtained through `validate`, so a body
//! whose signature failed can never reach decryption or normalization.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use adapters::key_cache::CachingKeyService;
pub use adapters::memory::{InMemoryCertificates, InMemoryKeyMaterial};
pub use domain::envelope::{
    Body, Envelope, EnvelopeHeader, EnvelopeProfile, GroupContext, HeaderStyle, PlainBody,
    ValidatedEnvelope,
};
pub use domain::errors::ProtocolError;
pub use ports::inbound::EnvelopeApi;
pub use ports::outbound::{
    CertificateError, CertificateSource, KeyMaterial, KeyMaterialSource, KeyService,
    KeyServiceError,
};
pub use service::EnvelopeProcessor;
