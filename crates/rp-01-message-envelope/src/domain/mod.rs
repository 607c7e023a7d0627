//! Envelope domain: pure parsing and string building.

pub mod canonical;
pub mod envelope;
pub mod errors;
pub mod lenient;
