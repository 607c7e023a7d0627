//! Adapters for the outbound ports.

pub mod key_cache;
pub mod memory;
