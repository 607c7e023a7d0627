//! Outbound port for the execution guard.

/// Answers whether a process recorded in a pidfile still exists.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}
