//! One normalizer per event family. Each turns a decrypted body into
//! canonical records without touching storage.

pub mod enrollment;
pub mod group;
pub mod instructor;
pub mod person;
