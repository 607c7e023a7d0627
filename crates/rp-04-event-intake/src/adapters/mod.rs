pub mod memory_queue;
pub mod memory_roster;
pub mod spool;
